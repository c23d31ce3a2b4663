//! Resource quantity parsing
//!
//! Kubernetes quantities follow the grammar
//! `<sign?><number><suffix?>` where the suffix is a binary SI unit
//! (`Ki`..`Ei`), a decimal SI unit (`n`, `u`, `m`, `k`, `M`..`E`) or a
//! decimal exponent (`e3`, `E-2`).

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{KubeError, Result};

static QUANTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+|[KMGTPE]i|[numkMGTPE])?$")
        .expect("valid regex")
});

/// Parse a quantity string, naming `resource` in the error
pub fn parse_quantity(resource: &str, value: &str) -> Result<Quantity> {
    let value = value.trim();
    if QUANTITY.is_match(value) {
        Ok(Quantity(value.to_string()))
    } else {
        Err(KubeError::InvalidQuantity {
            resource: resource.to_string(),
            value: value.to_string(),
        })
    }
}
