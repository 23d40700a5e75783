//! Display text for the method and module columns.

use crate::model::MethodRef;

/// Host hook for rendering referrers; presentation only.
pub trait SignatureRenderer: Send + Sync {
    fn method_signature(&self, method: &MethodRef) -> String;

    fn module_name(&self, method: &MethodRef) -> String {
        method.module_name().to_string()
    }
}

/// `Namespace.Type::Method`, with no parameter or return types.
pub struct PlainRenderer;

impl SignatureRenderer for PlainRenderer {
    fn method_signature(&self, method: &MethodRef) -> String {
        format!("{}::{}", method.declaring_type().full_name(), method.name())
    }
}
