pub mod intent;
pub mod options;
pub mod pipeline;

pub use intent::{estimate_gas, gas_price, parse_operations, required_signers, ConstructionIntent};
pub use options::{
    validate_metadata, validate_options, ConstructionMetadata, ConstructionOptions, SignerData,
};
pub use pipeline::{ConstructionService, CURVE_SECP256K1, SIGNATURE_ECDSA};
