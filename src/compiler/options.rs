use crate::error::CompileError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Switches that tune how a flow graph is planned.
///
/// Options can be deserialized with serde or parsed from the compact list
/// syntax `"+enableCombiner,-compressFlowPart"`, where `+` turns an item on and
/// `-` turns it off. Items not mentioned keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerOptions {
    /// Allow combiners for fold/summarize operators whose partial
    /// aggregation is left at its default.
    pub enable_combiner: bool,
    /// Merge flow-parts into their callers instead of keeping them apart.
    pub compress_flow_part: bool,
    /// Merge independent stages of the same depth into one stage.
    pub compress_concurrent_stage: bool,
    /// Merge the map blocks that feed one stage into a single map block.
    pub compress_flow_block_group: bool,
    /// Keep `Logging` operators declared at debug level.
    pub enable_debug_logging: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            enable_combiner: false,
            compress_flow_part: true,
            compress_concurrent_stage: true,
            compress_flow_block_group: true,
            enable_debug_logging: false,
        }
    }
}

/// Tri-state value for generic on/off settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericOptionValue {
    Enabled,
    Disabled,
    Auto,
}

impl GenericOptionValue {
    const ENABLED: &'static [&'static str] = &["enabled", "enable", "t", "true", "y", "yes", "on"];
    const DISABLED: &'static [&'static str] =
        &["disabled", "disable", "f", "false", "n", "no", "off"];

    pub fn resolve(self, default: bool) -> bool {
        match self {
            GenericOptionValue::Enabled => true,
            GenericOptionValue::Disabled => false,
            GenericOptionValue::Auto => default,
        }
    }
}

impl FromStr for GenericOptionValue {
    type Err = CompileError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let symbol = value.trim().to_ascii_lowercase();
        if Self::ENABLED.contains(&symbol.as_str()) {
            Ok(GenericOptionValue::Enabled)
        } else if Self::DISABLED.contains(&symbol.as_str()) {
            Ok(GenericOptionValue::Disabled)
        } else if symbol == "auto" {
            Ok(GenericOptionValue::Auto)
        } else {
            Err(CompileError::InvalidOption {
                option: value.to_string(),
                message: "expected one of enabled, disabled or auto".to_string(),
            })
        }
    }
}

impl CompilerOptions {
    /// Parses a comma separated option list on top of the defaults.
    pub fn parse(text: &str) -> Result<Self, CompileError> {
        let mut options = Self::default();
        for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (value, name) = if let Some(name) = item.strip_prefix('+') {
                (GenericOptionValue::Enabled, name)
            } else if let Some(name) = item.strip_prefix('-') {
                (GenericOptionValue::Disabled, name)
            } else if let Some((name, value)) = item.split_once('=') {
                (value.parse()?, name)
            } else {
                return Err(CompileError::InvalidOption {
                    option: item.to_string(),
                    message: "items must start with '+' or '-' or be 'name=value'".to_string(),
                });
            };
            options.set(name.trim(), value)?;
        }
        Ok(options)
    }

    fn set(&mut self, name: &str, value: GenericOptionValue) -> Result<(), CompileError> {
        let defaults = Self::default();
        let (slot, default) = match name {
            "enableCombiner" => (&mut self.enable_combiner, defaults.enable_combiner),
            "compressFlowPart" => (&mut self.compress_flow_part, defaults.compress_flow_part),
            "compressConcurrentStage" => (
                &mut self.compress_concurrent_stage,
                defaults.compress_concurrent_stage,
            ),
            "compressFlowBlockGroup" => (
                &mut self.compress_flow_block_group,
                defaults.compress_flow_block_group,
            ),
            "enableDebugLogging" => (
                &mut self.enable_debug_logging,
                defaults.enable_debug_logging,
            ),
            _ => {
                return Err(CompileError::InvalidOption {
                    option: name.to_string(),
                    message: "unknown option item".to_string(),
                });
            }
        };
        *slot = value.resolve(default);
        Ok(())
    }
}

impl FromStr for CompilerOptions {
    type Err = CompileError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl fmt::Display for CompilerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let item = |on: bool, name: &str| format!("{}{}", if on { '+' } else { '-' }, name);
        write!(
            f,
            "{},{},{},{},{}",
            item(self.enable_combiner, "enableCombiner"),
            item(self.compress_flow_part, "compressFlowPart"),
            item(self.compress_concurrent_stage, "compressConcurrentStage"),
            item(self.compress_flow_block_group, "compressFlowBlockGroup"),
            item(self.enable_debug_logging, "enableDebugLogging"),
        )
    }
}
