use serde::{Deserialize, Serialize};

use crate::error::{Result, SalesError};

/// Which input column feeds each field of a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// `None` for inputs without a date; date-based tables are then skipped.
    pub date: Option<String>,
    pub product: String,
    pub quantity: String,
    pub gross_amount: String,
    pub category: String,
    #[serde(default)]
    pub cost: Option<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self::with_date_column("data")
    }
}

impl ColumnMapping {
    fn with_date_column(date: &str) -> Self {
        Self {
            date: Some(date.to_string()),
            product: "produto".to_string(),
            quantity: "quantidade".to_string(),
            gross_amount: "valor_total".to_string(),
            category: "categoria".to_string(),
            cost: Some("custo".to_string()),
        }
    }

    /// Named column layouts; the presets differ only in the date column.
    pub fn preset(key: &str) -> Result<Self> {
        match key {
            "data" => Ok(Self::with_date_column("data")),
            "data_venda" => Ok(Self::with_date_column("data_venda")),
            other => Err(SalesError::UnknownPreset(other.to_string())),
        }
    }

    fn required(&self) -> Vec<&str> {
        let mut cols: Vec<&str> = Vec::with_capacity(5);
        if let Some(date) = &self.date {
            cols.push(date.as_str());
        }
        cols.extend([
            self.product.as_str(),
            self.quantity.as_str(),
            self.gross_amount.as_str(),
            self.category.as_str(),
        ]);
        cols
    }
}

/// Column positions resolved against a concrete header row.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub date: Option<usize>,
    pub product: usize,
    pub quantity: usize,
    pub gross_amount: usize,
    pub category: usize,
    pub cost: Option<usize>,
}

impl Schema {
    pub fn has_cost_data(&self) -> bool {
        self.cost.is_some()
    }

    pub fn has_date(&self) -> bool {
        self.date.is_some()
    }
}

fn position(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

/// Resolve the mapping against `headers`, failing with every missing
/// required column named in mapping order.
pub fn validate(headers: &[String], mapping: &ColumnMapping) -> Result<Schema> {
    let missing: Vec<String> = mapping
        .required()
        .into_iter()
        .filter(|col| position(headers, col).is_none())
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(SalesError::Schema { missing });
    }

    let at = |name: &str| position(headers, name).unwrap_or_default();
    Ok(Schema {
        date: mapping.date.as_deref().map(|d| at(d)),
        product: at(&mapping.product),
        quantity: at(&mapping.quantity),
        gross_amount: at(&mapping.gross_amount),
        category: at(&mapping.category),
        cost: mapping.cost.as_deref().and_then(|c| position(headers, c)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_validate_resolves_positions() {
        let h = headers(&["categoria", "data", "produto", "quantidade", "valor_total", "custo"]);
        let schema = validate(&h, &ColumnMapping::default()).unwrap();
        assert_eq!(schema.date, Some(1));
        assert_eq!(schema.category, 0);
        assert_eq!(schema.cost, Some(5));
        assert!(schema.has_cost_data());
    }

    #[test]
    fn test_cost_is_optional() {
        let h = headers(&["data", "produto", "quantidade", "valor_total", "categoria"]);
        let schema = validate(&h, &ColumnMapping::default()).unwrap();
        assert!(!schema.has_cost_data());
    }

    #[test]
    fn test_missing_category_is_named() {
        let h = headers(&["data", "produto", "quantidade", "valor_total"]);
        let err = validate(&h, &ColumnMapping::default()).unwrap_err();
        match &err {
            SalesError::Schema { missing } => assert_eq!(missing, &vec!["categoria".to_string()]),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("categoria"));
    }

    #[test]
    fn test_all_missing_columns_joined() {
        let h = headers(&["produto", "quantidade", "valor_total"]);
        let err = validate(&h, &ColumnMapping::preset("data_venda").unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Missing required column(s): data_venda, categoria");
    }

    #[test]
    fn test_mapping_without_date() {
        let mut mapping = ColumnMapping::default();
        mapping.date = None;
        let h = headers(&["produto", "quantidade", "valor_total", "categoria"]);
        let schema = validate(&h, &mapping).unwrap();
        assert!(!schema.has_date());
    }

    #[test]
    fn test_unknown_preset() {
        assert!(matches!(
            ColumnMapping::preset("fecha"),
            Err(SalesError::UnknownPreset(_))
        ));
    }
}
