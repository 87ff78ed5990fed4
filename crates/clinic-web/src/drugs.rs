//! 药品目录
//!
//! 只读的静态目录，按编码、类型或厂商查询，比较时忽略大小写。

use axum::{extract::Path, Json};
use clinic_core::ClinicError;
use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;

/// 药品条目
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Drug {
    pub name: &'static str,
    pub code: &'static str,
    #[serde(rename = "type")]
    pub drug_type: &'static str,
    pub manufacturer: &'static str,
    pub stock: u32,
}

const fn drug(
    name: &'static str,
    code: &'static str,
    drug_type: &'static str,
    manufacturer: &'static str,
    stock: u32,
) -> Drug {
    Drug {
        name,
        code,
        drug_type,
        manufacturer,
        stock,
    }
}

pub static DRUGS: [Drug; 20] = [
    drug("Paracetamol", "DRUG-001", "Analgesic", "GlaxoSmithKline", 500),
    drug("Amoxicillin", "DRUG-002", "Antibiotic", "Pfizer", 350),
    drug("Ibuprofen", "DRUG-003", "Analgesic", "Johnson & Johnson", 420),
    drug("Loratadine", "DRUG-004", "Antihistamine", "Bayer", 280),
    drug("Metformin", "DRUG-005", "Antidiabetic", "Merck", 180),
    drug("Atorvastatin", "DRUG-006", "Statin", "Pfizer", 200),
    drug("Omeprazole", "DRUG-007", "Proton Pump Inhibitor", "AstraZeneca", 320),
    drug("Salbutamol", "DRUG-008", "Bronchodilator", "GlaxoSmithKline", 150),
    drug("Diazepam", "DRUG-009", "Benzodiazepine", "Roche", 100),
    drug("Ciprofloxacin", "DRUG-010", "Antibiotic", "Bayer", 250),
    drug("Hydrochlorothiazide", "DRUG-011", "Diuretic", "Novartis", 180),
    drug("Fluoxetine", "DRUG-012", "SSRI", "Eli Lilly", 120),
    drug("Warfarin", "DRUG-013", "Anticoagulant", "Bristol-Myers Squibb", 90),
    drug("Morphine", "DRUG-014", "Analgesic", "Purdue Pharma", 50),
    drug("Levothyroxine", "DRUG-015", "Thyroid Hormone", "Abbott", 220),
    drug("Aspirin", "DRUG-016", "Analgesic", "Bayer", 600),
    drug("Ceftriaxone", "DRUG-017", "Antibiotic", "Pfizer", 180),
    drug("Lisinopril", "DRUG-018", "ACE Inhibitor", "Merck", 240),
    drug("Ventolin", "DRUG-019", "Bronchodilator", "GlaxoSmithKline", 120),
    drug("Simvastatin", "DRUG-020", "Statin", "Merck", 190),
];

pub fn find_by_code(code: &str) -> Option<&'static Drug> {
    DRUGS.iter().find(|d| d.code.eq_ignore_ascii_case(code))
}

pub fn filter_by_type(drug_type: &str) -> Vec<&'static Drug> {
    DRUGS
        .iter()
        .filter(|d| d.drug_type.eq_ignore_ascii_case(drug_type))
        .collect()
}

pub fn filter_by_manufacturer(manufacturer: &str) -> Vec<&'static Drug> {
    DRUGS
        .iter()
        .filter(|d| d.manufacturer.eq_ignore_ascii_case(manufacturer))
        .collect()
}

fn non_empty(
    drugs: Vec<&'static Drug>,
    what: &str,
    value: &str,
) -> Result<Json<Vec<&'static Drug>>, ApiError> {
    if drugs.is_empty() {
        return Err(ClinicError::NotFound(format!("no drugs with {} {}", what, value)).into());
    }
    Ok(Json(drugs))
}

/// 全部药品
pub async fn list_drugs() -> Json<&'static [Drug]> {
    Json(&DRUGS[..])
}

pub async fn drug_by_code(Path(code): Path<String>) -> Result<Json<&'static Drug>, ApiError> {
    debug!("Looking up drug by code {}", code);
    find_by_code(&code)
        .map(Json)
        .ok_or_else(|| ClinicError::NotFound(format!("drug {}", code)).into())
}

pub async fn drugs_by_type(
    Path(drug_type): Path<String>,
) -> Result<Json<Vec<&'static Drug>>, ApiError> {
    non_empty(filter_by_type(&drug_type), "type", &drug_type)
}

pub async fn drugs_by_manufacturer(
    Path(manufacturer): Path<String>,
) -> Result<Json<Vec<&'static Drug>>, ApiError> {
    non_empty(
        filter_by_manufacturer(&manufacturer),
        "manufacturer",
        &manufacturer,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_code_ignores_case() {
        let drug = find_by_code("drug-007").unwrap();
        assert_eq!(drug.name, "Omeprazole");
        assert!(find_by_code("DRUG-999").is_none());
    }

    #[test]
    fn test_filter_by_type() {
        let names: Vec<_> = filter_by_type("analgesic").iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["Paracetamol", "Ibuprofen", "Morphine", "Aspirin"]);
        assert!(filter_by_type("Vaccine").is_empty());
    }

    #[test]
    fn test_filter_by_manufacturer() {
        assert_eq!(filter_by_manufacturer("BAYER").len(), 3);
        assert_eq!(filter_by_manufacturer("Johnson & Johnson").len(), 1);
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(DRUGS[0]).unwrap();
        assert_eq!(value["type"], "Analgesic");
        assert_eq!(value["stock"], 500);
        assert!(value.get("drug_type").is_none());
    }

    #[tokio::test]
    async fn test_empty_lookup_is_not_found() {
        let err = drugs_by_type(Path("Vaccine".to_string())).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
    }
}
