use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::DescriptorError;

/// The wire shape of the capability record. The compiler step that produces
/// it declares many more fields (ranges, port topology, clock terminals);
/// only the ones the demultiplexer consumes are modelled here, and unknown
/// fields pass through untouched.
#[derive(Debug, Deserialize)]
struct RawDescriptor {
    device_name: String,
    #[serde(default)]
    analog_inputs: Option<Vec<String>>,
    #[serde(default)]
    num_analog_inputs: Option<usize>,
}

/// An immutable device capability descriptor, reduced to the fields the
/// demultiplexer reads: the device name and the analog-input channels a
/// producer may reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    device_name: String,
    analog_inputs: Vec<String>,
}

impl DeviceDescriptor {
    /// Parse and validate a descriptor from JSON. Fails fast on missing
    /// required fields, an empty or duplicated channel list, or a count
    /// that disagrees with the named channels.
    pub fn from_json(raw: &str) -> Result<Self, DescriptorError> {
        let raw: RawDescriptor = serde_json::from_str(raw)?;

        let analog_inputs = match (raw.analog_inputs, raw.num_analog_inputs) {
            (Some(names), declared) => {
                if names.is_empty() {
                    return Err(DescriptorError::EmptyAnalogInputs);
                }
                if let Some(declared) = declared {
                    if declared != names.len() {
                        return Err(DescriptorError::CountMismatch {
                            declared,
                            named: names.len(),
                        });
                    }
                }
                let mut seen = HashSet::new();
                for name in &names {
                    if !seen.insert(name.as_str()) {
                        return Err(DescriptorError::DuplicateChannel(name.clone()));
                    }
                }
                names
            }
            (None, Some(count)) => {
                if count == 0 {
                    return Err(DescriptorError::EmptyAnalogInputs);
                }
                // Older capability records name no channels; generate the
                // legacy ai{i} scheme.
                warn!(
                    device = %raw.device_name,
                    "descriptor names no analog inputs; assuming legacy ai0..ai{} naming",
                    count - 1
                );
                (0..count).map(|i| format!("ai{i}")).collect()
            }
            (None, None) => return Err(DescriptorError::NoAnalogInputs),
        };

        Ok(Self {
            device_name: raw.device_name,
            analog_inputs,
        })
    }

    /// Read and validate a descriptor file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DescriptorError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| DescriptorError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// The declared device name.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// The analog-input channel names, in declaration order.
    pub fn analog_inputs(&self) -> &[String] {
        &self.analog_inputs
    }
}
