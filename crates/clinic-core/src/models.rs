//! 核心数据模型定义

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::{ClinicError, Result};
use crate::paging::{PageRequest, PagingLimits};

/// 搜索词最大长度
pub const MAX_SEARCH_TERM_LEN: usize = 100;

/// 实体类型代码最大长度
pub const MAX_TYPE_CODE_LEN: usize = 8;

/// 实体记录（患者、员工、医生等共用一张表）
///
/// 除编号外所有字段都可为空，`None` 表示未设置。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityRecord {
    pub entity_no: i32,
    pub patient_no: Option<String>,
    #[serde(rename = "fName")]
    pub first_name: Option<String>,
    #[serde(rename = "mName")]
    pub middle_name: Option<String>,
    #[serde(rename = "lName")]
    pub last_name: Option<String>,
    #[serde(deserialize_with = "lenient_date")]
    pub dob: Option<NaiveDate>,
    pub sex: Option<String>,
    pub entity_type_code: Option<String>,
    pub id_type: Option<String>,
    pub id_no: Option<String>,
    pub marital_status: Option<String>,
    pub nationality: Option<String>,
    pub disability: Option<String>,
    pub remark: Option<String>,
    #[serde(deserialize_with = "lenient_date")]
    pub status_date: Option<NaiveDate>,
    pub designation: Option<String>,
    pub qualification: Option<String>,
    /// 软删除标记，`Some(false)` 表示已停用
    pub status: Option<bool>,
    /// 登记日期
    #[serde(deserialize_with = "lenient_date")]
    pub dor: Option<NaiveDate>,
    pub pat_insured: Option<bool>,
    pub country_no: Option<i32>,
    pub title: Option<String>,
    pub file_no: Option<String>,
    pub department_no: Option<i32>,
    pub company_no: Option<i32>,
    pub branch_no: Option<i32>,
    pub employee_pin_no: Option<String>,
    pub bank_account_no: Option<String>,
    pub nssf_no: Option<String>,
    pub nhif_no: Option<String>,
    pub employment_type_no: Option<i32>,
    pub age: Option<i32>,
    pub regby: Option<String>,
    pub next_kin: Option<String>,
    pub next_kin_mobile: Option<String>,
    pub next_kin_relationship: Option<String>,
    pub registered_by: Option<i32>,
    pub modified_by: Option<i32>,
    pub modified_date: Option<DateTime<Utc>>,
    pub patient_pay_type: Option<String>,
    pub father: Option<String>,
    pub mother: Option<String>,
    pub staff_no: Option<String>,
    pub bank_no: Option<i32>,
    pub bank_branch_no: Option<i32>,
    pub mpesa_mobile_no: Option<String>,
    pub salary_payment_mode: Option<String>,
}

impl EntityRecord {
    /// 创建指定类型的空白记录
    pub fn with_type(entity_type_code: &str) -> Self {
        Self {
            entity_type_code: Some(entity_type_code.to_string()),
            ..Default::default()
        }
    }

    /// 全名：称谓 + 名 + 中间名 + 姓
    pub fn full_name(&self) -> String {
        [&self.title, &self.first_name, &self.middle_name, &self.last_name]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn kind(&self) -> Option<EntityKind> {
        self.entity_type_code.as_deref().map(EntityKind::from_code)
    }

    /// 状态为空的旧数据视为有效
    pub fn is_active(&self) -> bool {
        self.status != Some(false)
    }

    /// 登记和更新前的规范化与校验，类型代码去除首尾空白后写回
    pub fn prepare_for_save(&mut self) -> Result<()> {
        let code = match self.entity_type_code.as_deref() {
            Some(code) => code.trim().to_string(),
            None => {
                return Err(ClinicError::Validation(
                    "entityTypeCode is required".to_string(),
                ))
            }
        };
        validate_type_code(&code)?;
        self.entity_type_code = Some(code);
        Ok(())
    }
}

/// 实体类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Patient,
    Staff,
    Other(String),
}

impl EntityKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "PAT" => EntityKind::Patient,
            "STA" => EntityKind::Staff,
            other => EntityKind::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            EntityKind::Patient => "PAT",
            EntityKind::Staff => "STA",
            EntityKind::Other(code) => code,
        }
    }
}

/// 实体查询过滤条件（来自请求参数）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityFilter {
    pub search_term: Option<String>,
    pub entity_type_code: Option<String>,
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
    /// 是否包含已停用的实体
    pub include_inactive: bool,
}

impl EntityFilter {
    pub fn page(page_number: i64, page_size: i64) -> Self {
        Self {
            page_number: Some(page_number),
            page_size: Some(page_size),
            ..Default::default()
        }
    }

    pub fn search(mut self, term: &str) -> Self {
        self.search_term = Some(term.to_string());
        self
    }

    pub fn of_type(mut self, code: &str) -> Self {
        self.entity_type_code = Some(code.to_string());
        self
    }

    pub fn including_inactive(mut self) -> Self {
        self.include_inactive = true;
        self
    }

    /// 校验并规范化：空白字符串视为未设置，页码页大小按上限收敛
    pub fn normalize(&self, limits: &PagingLimits) -> Result<NormalizedFilter> {
        let search_term = non_blank(&self.search_term);
        if let Some(term) = &search_term {
            if term.chars().count() > MAX_SEARCH_TERM_LEN {
                return Err(ClinicError::Validation(format!(
                    "searchTerm must be at most {} characters",
                    MAX_SEARCH_TERM_LEN
                )));
            }
        }

        let entity_type_code = non_blank(&self.entity_type_code);
        if let Some(code) = &entity_type_code {
            validate_type_code(code)?;
        }

        Ok(NormalizedFilter {
            search_term,
            entity_type_code,
            page: PageRequest::clamped(self.page_number, self.page_size, limits),
            include_inactive: self.include_inactive,
        })
    }
}

/// 规范化后的过滤条件
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFilter {
    pub search_term: Option<String>,
    pub entity_type_code: Option<String>,
    pub page: PageRequest,
    pub include_inactive: bool,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// 日期字段既接受 `YYYY-MM-DD`，也接受浏览器提交的 RFC 3339 时间戳（取其日期部分）
fn lenient_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(text) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(timestamp.date_naive()));
    }
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Some(timestamp.date()));
    }
    Err(de::Error::custom(format!(
        "invalid date '{}', expected YYYY-MM-DD or an RFC 3339 timestamp",
        text
    )))
}

fn validate_type_code(code: &str) -> Result<()> {
    let well_formed = !code.is_empty()
        && code.len() <= MAX_TYPE_CODE_LEN
        && code.chars().all(|c| c.is_ascii_alphanumeric());
    if well_formed {
        Ok(())
    } else {
        Err(ClinicError::Validation(format!(
            "entityTypeCode '{}' must be 1-{} ASCII letters or digits",
            code, MAX_TYPE_CODE_LEN
        )))
    }
}
