//! # Durable Transactions
//!
//! The typed transaction carried (as opaque bytes) by the transaction log and
//! applied to reliable storage by the persistence engine.
//!
//! Encoding uses bincode so that the log only ever sees a byte blob.

use serde::{Deserialize, Serialize};

use crate::entities::PackedObject;
use crate::errors::CodecError;

/// A unit of durable work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurableTransaction {
    /// Store (insert or replace) every item.
    Put { items: Vec<PackedObject> },
    /// Remove every item.
    Delete { items: Vec<PackedObject> },
    /// Puts and deletes committed together.
    Mixed {
        items_to_put: Vec<PackedObject>,
        items_to_delete: Vec<PackedObject>,
    },
}

impl DurableTransaction {
    /// Items to store, in application order.
    pub fn items_to_put(&self) -> &[PackedObject] {
        match self {
            DurableTransaction::Put { items } => items,
            DurableTransaction::Delete { .. } => &[],
            DurableTransaction::Mixed { items_to_put, .. } => items_to_put,
        }
    }

    /// Items to delete, in application order.
    pub fn items_to_delete(&self) -> &[PackedObject] {
        match self {
            DurableTransaction::Put { .. } => &[],
            DurableTransaction::Delete { items } => items,
            DurableTransaction::Mixed {
                items_to_delete, ..
            } => items_to_delete,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items_to_put().is_empty() && self.items_to_delete().is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(self).map_err(|e| CodecError::Encode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// Serialize one object for a storage block.
pub fn encode_object(object: &PackedObject) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(object).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Deserialize one object read back from a storage block.
pub fn decode_object(bytes: &[u8]) -> Result<PackedObject, CodecError> {
    bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_transaction_accessors() {
        let put = PackedObject::new("orders", 1, vec![1]);
        let delete = PackedObject::new("orders", 2, vec![2]);
        let tx = DurableTransaction::Mixed {
            items_to_put: vec![put.clone()],
            items_to_delete: vec![delete.clone()],
        };

        assert_eq!(tx.items_to_put(), &[put]);
        assert_eq!(tx.items_to_delete(), &[delete]);
        assert!(!tx.is_empty());
    }

    #[test]
    fn test_transaction_survives_encoding() {
        let tx = DurableTransaction::Delete {
            items: vec![PackedObject::new("orders", "A-1", vec![9, 9])],
        };
        let bytes = tx.to_bytes().unwrap();
        assert_eq!(DurableTransaction::from_bytes(&bytes).unwrap(), tx);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let result = DurableTransaction::from_bytes(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }
}
