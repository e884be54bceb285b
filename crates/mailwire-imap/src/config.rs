//! Body retrieval configuration.

use std::num::NonZeroU32;

/// Default block size for streamed section fetches.
pub const DEFAULT_FETCH_BLOCK_SIZE: u32 = 16384;

const DEFAULT_FETCH_BLOCK_SIZE_NONZERO: NonZeroU32 = match NonZeroU32::new(DEFAULT_FETCH_BLOCK_SIZE)
{
    Some(v) => v,
    None => panic!("DEFAULT_FETCH_BLOCK_SIZE must be non-zero"),
};

/// How body content is fetched from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchConfig {
    /// Block size for partial fetches; `None` fetches sections in one go.
    pub fetch_block_size: Option<NonZeroU32>,
    /// Do not trust the size reported in BODYSTRUCTURE when streaming.
    pub ignore_body_structure_size: bool,
    /// Decode RFC 2047 encoded-words in attachment file names.
    pub decode_file_name: bool,
    /// Default peek mode for messages that do not choose their own.
    pub peek: bool,
}

impl FetchConfig {
    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fetch_block_size: Some(DEFAULT_FETCH_BLOCK_SIZE_NONZERO),
            ignore_body_structure_size: false,
            decode_file_name: false,
            peek: false,
        }
    }

    /// Creates a configuration builder.
    #[must_use]
    pub const fn builder() -> FetchConfigBuilder {
        FetchConfigBuilder::new()
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`FetchConfig`].
#[derive(Debug, Clone)]
pub struct FetchConfigBuilder {
    config: FetchConfig,
}

impl FetchConfigBuilder {
    /// Creates a builder holding the defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            config: FetchConfig::new(),
        }
    }

    /// Sets the block size; `0` disables block streaming.
    #[must_use]
    pub const fn fetch_block_size(mut self, size: u32) -> Self {
        self.config.fetch_block_size = NonZeroU32::new(size);
        self
    }

    /// Ignores the declared section size when streaming.
    #[must_use]
    pub const fn ignore_body_structure_size(mut self, ignore: bool) -> Self {
        self.config.ignore_body_structure_size = ignore;
        self
    }

    /// Enables decoding of encoded-word file names.
    #[must_use]
    pub const fn decode_file_name(mut self, decode: bool) -> Self {
        self.config.decode_file_name = decode;
        self
    }

    /// Sets the default peek mode.
    #[must_use]
    pub const fn peek(mut self, peek: bool) -> Self {
        self.config.peek = peek;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub const fn build(self) -> FetchConfig {
        self.config
    }
}

impl Default for FetchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.fetch_block_size.map(NonZeroU32::get), Some(16384));
        assert!(!config.ignore_body_structure_size);
        assert!(!config.decode_file_name);
        assert!(!config.peek);
    }

    #[test]
    fn test_builder() {
        let config = FetchConfig::builder()
            .fetch_block_size(4096)
            .ignore_body_structure_size(true)
            .decode_file_name(true)
            .peek(true)
            .build();

        assert_eq!(config.fetch_block_size.map(NonZeroU32::get), Some(4096));
        assert!(config.ignore_body_structure_size);
        assert!(config.decode_file_name);
        assert!(config.peek);
    }

    #[test]
    fn test_zero_block_size_disables_streaming() {
        let config = FetchConfig::builder().fetch_block_size(0).build();
        assert!(config.fetch_block_size.is_none());
    }
}
