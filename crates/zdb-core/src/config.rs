//! Tuning knobs for the lazily built indices of [`DebugData`](crate::DebugData).

use crate::error::{ZdbError, ZdbResult};

/// Default pc distance between two line-program checkpoints.
pub const DEFAULT_CHECKPOINT_STRIDE: u32 = 100;

/// Configuration for the derived indices of a decoded store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig
{
    /// Record a line-program checkpoint every `checkpoint_stride` pcs.
    ///
    /// Smaller strides make single `resolve_location` queries replay less of
    /// the line program at the cost of a larger checkpoint list.
    pub checkpoint_stride: u32,
}

impl Default for IndexConfig
{
    fn default() -> Self
    {
        Self {
            checkpoint_stride: DEFAULT_CHECKPOINT_STRIDE,
        }
    }
}

impl IndexConfig
{
    /// Create a configuration with a custom checkpoint stride.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidConfig` if `checkpoint_stride` is zero.
    pub fn with_checkpoint_stride(checkpoint_stride: u32) -> ZdbResult<Self>
    {
        let config = Self { checkpoint_stride };
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the indices cannot work with.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidConfig` if `checkpoint_stride` is zero.
    pub fn validate(&self) -> ZdbResult<()>
    {
        if self.checkpoint_stride == 0 {
            return Err(ZdbError::InvalidConfig("checkpoint stride must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_default_stride()
    {
        assert_eq!(IndexConfig::default().checkpoint_stride, 100);
    }

    #[test]
    fn test_zero_stride_rejected()
    {
        assert!(IndexConfig::with_checkpoint_stride(0).is_err());
        assert!(IndexConfig::with_checkpoint_stride(1).is_ok());
    }
}
