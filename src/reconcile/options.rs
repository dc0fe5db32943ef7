//! Options for reconciling a desired object.

/// ApplyOptions tunes how [`create_or_merge`](super::create_or_merge) treats the
/// desired object. The default strips null and empty desired fields and keeps
/// the observed finalizers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Keep desired fields holding null or `""` instead of stripping them.
    pub accept_null_field_values: bool,
    /// Remove `metadata.finalizers` from the object written back.
    pub set_finalizers_to_null: bool,
}

impl ApplyOptions {
    /// Creates a new ApplyOptionsBuilder.
    pub fn builder() -> ApplyOptionsBuilder {
        ApplyOptionsBuilder::new()
    }
}

/// ApplyOptionsBuilder is a builder for creating ApplyOptions.
#[derive(Debug, Default)]
pub struct ApplyOptionsBuilder {
    options: ApplyOptions,
}

impl ApplyOptionsBuilder {
    pub fn new() -> Self {
        ApplyOptionsBuilder::default()
    }

    /// Sets whether null and empty desired fields are sent as is.
    pub fn accept_null_field_values(mut self, accept: bool) -> Self {
        self.options.accept_null_field_values = accept;
        self
    }

    /// Sets whether finalizers are cleared on update.
    pub fn set_finalizers_to_null(mut self, clear: bool) -> Self {
        self.options.set_finalizers_to_null = clear;
        self
    }

    pub fn build(self) -> ApplyOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        assert_eq!(ApplyOptions::builder().build(), ApplyOptions::default());

        let options = ApplyOptions::builder()
            .accept_null_field_values(true)
            .set_finalizers_to_null(true)
            .build();
        assert!(options.accept_null_field_values);
        assert!(options.set_finalizers_to_null);
    }
}
