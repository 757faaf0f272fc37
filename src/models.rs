use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference to the thing a stock row, ledger movement or order line is
/// about: either a bare product or a specific variant. Exactly one of the
/// two — the enum makes the "never both, never neither" rule structural
/// instead of a pair of nullable foreign keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ItemRef {
    Product(Uuid),
    Variant(Uuid),
}

impl ItemRef {
    /// Rebuilds the reference from a nullable column pair. The variant wins
    /// when both are present: order lines for a variant also carry the
    /// parent product id for reporting.
    pub fn from_columns(product_id: Option<Uuid>, variant_id: Option<Uuid>) -> Option<Self> {
        variant_id
            .map(ItemRef::Variant)
            .or(product_id.map(ItemRef::Product))
    }

    pub fn product_id(&self) -> Option<Uuid> {
        match self {
            ItemRef::Product(id) => Some(*id),
            ItemRef::Variant(_) => None,
        }
    }

    pub fn variant_id(&self) -> Option<Uuid> {
        match self {
            ItemRef::Product(_) => None,
            ItemRef::Variant(id) => Some(*id),
        }
    }
}

impl std::fmt::Display for ItemRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemRef::Product(id) => write!(f, "product:{}", id),
            ItemRef::Variant(id) => write!(f, "variant:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_wins_when_both_columns_are_set() {
        let product = Uuid::new_v4();
        let variant = Uuid::new_v4();
        assert_eq!(
            ItemRef::from_columns(Some(product), Some(variant)),
            Some(ItemRef::Variant(variant))
        );
    }

    #[test]
    fn missing_both_columns_yields_none() {
        assert_eq!(ItemRef::from_columns(None, None), None);
    }

    #[test]
    fn display_is_keyed_by_kind() {
        let id = Uuid::nil();
        assert_eq!(
            ItemRef::Product(id).to_string(),
            format!("product:{}", Uuid::nil())
        );
        assert_eq!(
            ItemRef::Variant(id).to_string(),
            format!("variant:{}", Uuid::nil())
        );
    }
}
