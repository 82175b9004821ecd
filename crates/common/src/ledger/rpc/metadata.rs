//! The parts of a runtime's metadata a client needs after submission:
//! the type of `System.Events`, pallet error names and the signed
//! extension order.

use frame_metadata::v14::StorageEntryType;
use frame_metadata::{RuntimeMetadata, RuntimeMetadataPrefixed};
use parity_scale_codec::Decode;
use scale_info::{PortableRegistry, TypeDef};

use super::extrinsic::SignedExtension;
use super::value::{self, DecodeError, Value};
use crate::ledger::DispatchError;

/// `twox128("System") ++ twox128("Events")`
pub const SYSTEM_EVENTS_KEY: &str =
    "0x26aa394eea5630e07c48ae0c9558cef780d41e5e16056765bc8461851072c9d7";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("malformed runtime metadata: {0}")]
    Malformed(String),
    #[error("unsupported runtime metadata version {0}")]
    Unsupported(u32),
    #[error("runtime metadata has no System.Events storage")]
    NoEvents,
    #[error("malformed events: {0}")]
    Events(#[from] DecodeError),
}

#[derive(Debug)]
struct Pallet {
    index: u8,
    name: String,
    error_ty: Option<u32>,
}

#[derive(Debug)]
struct Extension {
    identifier: String,
    /// Carries no bytes in either `extra` or `additional`
    empty: bool,
}

/// What the events of one extrinsic say about its dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtrinsicOutcome {
    pub dispatch_error: Option<DispatchError>,
    /// Position among the block's stored entries, from
    /// `TransactionStorage.Stored` or `Renewed`
    pub stored_index: Option<u32>,
}

#[derive(Debug)]
pub struct RuntimeTypes {
    registry: PortableRegistry,
    events_ty: u32,
    pallets: Vec<Pallet>,
    extensions: Vec<Extension>,
}

impl RuntimeTypes {
    /// Parse the SCALE bytes returned by `state_getMetadata`.
    pub fn decode(bytes: &[u8]) -> Result<Self, MetadataError> {
        let prefixed = RuntimeMetadataPrefixed::decode(&mut &bytes[..])
            .map_err(|e| MetadataError::Malformed(e.to_string()))?;
        let metadata = match prefixed.1 {
            RuntimeMetadata::V14(metadata) => metadata,
            other => return Err(MetadataError::Unsupported(other.version())),
        };

        let events_ty = metadata
            .pallets
            .iter()
            .filter(|pallet| pallet.name == "System")
            .filter_map(|pallet| pallet.storage.as_ref())
            .flat_map(|storage| storage.entries.iter())
            .find(|entry| entry.name == "Events")
            .and_then(|entry| match &entry.ty {
                StorageEntryType::Plain(ty) => Some(ty.id),
                _ => None,
            })
            .ok_or(MetadataError::NoEvents)?;

        let pallets = metadata
            .pallets
            .iter()
            .map(|pallet| Pallet {
                index: pallet.index,
                name: pallet.name.clone(),
                error_ty: pallet.error.as_ref().map(|error| error.ty.id),
            })
            .collect();

        let extensions = metadata
            .extrinsic
            .signed_extensions
            .iter()
            .map(|ext| Extension {
                identifier: ext.identifier.clone(),
                empty: is_empty(&metadata.types, ext.ty.id)
                    && is_empty(&metadata.types, ext.additional_signed.id),
            })
            .collect();

        Ok(Self {
            registry: metadata.types,
            events_ty,
            pallets,
            extensions,
        })
    }

    pub fn extension_identifiers(&self) -> Vec<&str> {
        self.extensions
            .iter()
            .map(|ext| ext.identifier.as_str())
            .collect()
    }

    /// Check that `configured` encodes what the runtime expects. Extensions
    /// without bytes may be missing on either side; every other one must
    /// appear on both, in the same order.
    pub fn check_extensions(&self, configured: &[SignedExtension]) -> Result<(), String> {
        let mismatch = || {
            format!(
                "configured signed extensions {:?} do not match the runtime's {:?}",
                configured
                    .iter()
                    .map(SignedExtension::identifier)
                    .collect::<Vec<_>>(),
                self.extension_identifiers()
            )
        };

        let mut runtime = self.extensions.iter().peekable();
        for ext in configured {
            while let Some(next) = runtime.peek() {
                if next.identifier == ext.identifier() || !next.empty {
                    break;
                }
                runtime.next();
            }
            match runtime.peek() {
                Some(next) if next.identifier == ext.identifier() => {
                    runtime.next();
                }
                _ if ext.is_empty() => {}
                _ => return Err(mismatch()),
            }
        }
        if runtime.any(|ext| !ext.empty) {
            return Err(mismatch());
        }
        Ok(())
    }

    /// Read the outcome of the extrinsic at `extrinsic_index` from the
    /// encoded `System.Events` of its block.
    pub fn outcome(
        &self,
        events: &[u8],
        extrinsic_index: u32,
    ) -> Result<ExtrinsicOutcome, MetadataError> {
        let mut outcome = ExtrinsicOutcome::default();
        if events.is_empty() {
            return Ok(outcome);
        }
        let records = value::decode(&self.registry, self.events_ty, &mut &events[..])?;

        for record in records.items() {
            let phase = record.field_or_first("phase");
            let applies = phase.and_then(Value::variant_name) == Some("ApplyExtrinsic")
                && phase
                    .and_then(|p| p.first())
                    .and_then(Value::as_u32)
                    == Some(extrinsic_index);
            if !applies {
                continue;
            }

            let Some(pallet_event) = record.field("event") else {
                continue;
            };
            let (Some(pallet), Some(event)) = (
                pallet_event.variant_name(),
                pallet_event.first(),
            ) else {
                continue;
            };

            match (pallet, event.variant_name()) {
                ("System", Some("ExtrinsicFailed")) => {
                    if let Some(error) = event.field_or_first("dispatch_error") {
                        outcome.dispatch_error = Some(self.dispatch_error(error));
                    }
                }
                ("Sudo", Some("Sudid")) => {
                    let result = event.field_or_first("sudo_result");
                    if let Some(error) = result
                        .filter(|r| r.variant_name() == Some("Err"))
                        .and_then(|r| r.first())
                    {
                        outcome.dispatch_error.get_or_insert(self.dispatch_error(error));
                    }
                }
                ("TransactionStorage", Some("Stored" | "Renewed")) => {
                    outcome.stored_index = event.field_or_first("index").and_then(Value::as_u32);
                }
                _ => {}
            }
        }
        Ok(outcome)
    }

    fn dispatch_error(&self, error: &Value) -> DispatchError {
        let Some(kind) = error.variant_name() else {
            return DispatchError::other("Unknown");
        };
        let inner = error.first();
        if kind == "Module" {
            let module = inner.map(|m| {
                let pallet = m.field_or_first("index").and_then(Value::as_u32);
                let code = m.field("error").and_then(|e| {
                    e.as_bytes()
                        .and_then(|bytes| bytes.first().copied())
                        .or_else(|| e.as_u32().and_then(|n| u8::try_from(n).ok()))
                });
                (pallet, code)
            });
            if let Some((Some(pallet), Some(code))) = module {
                if let Ok(pallet) = u8::try_from(pallet) {
                    return self.module_error(pallet, code);
                }
            }
        }
        match inner.and_then(Value::variant_name) {
            Some(detail) => DispatchError::other(&format!("{kind}.{detail}")),
            None => DispatchError::other(kind),
        }
    }

    fn module_error(&self, pallet: u8, code: u8) -> DispatchError {
        let Some(found) = self.pallets.iter().find(|p| p.index == pallet) else {
            return DispatchError::other(&format!("Module({pallet}, {code})"));
        };
        let name = found
            .error_ty
            .and_then(|ty| self.registry.resolve(ty))
            .and_then(|ty| match &ty.type_def {
                TypeDef::Variant(variants) => variants
                    .variants
                    .iter()
                    .find(|v| v.index == code)
                    .map(|v| v.name.clone()),
                _ => None,
            })
            .unwrap_or_else(|| format!("Error({code})"));
        DispatchError::module(&found.name, &name)
    }
}

/// Whether values of `ty` always encode to nothing.
fn is_empty(registry: &PortableRegistry, ty: u32) -> bool {
    let Some(resolved) = registry.resolve(ty) else {
        return false;
    };
    match &resolved.type_def {
        TypeDef::Composite(composite) => composite
            .fields
            .iter()
            .all(|field| is_empty(registry, field.ty.id)),
        TypeDef::Tuple(tuple) => tuple.fields.iter().all(|field| is_empty(registry, field.id)),
        TypeDef::Array(array) => array.len == 0 || is_empty(registry, array.type_param.id),
        _ => false,
    }
}
