//! 实体表列映射
//!
//! `ENTITY_COLUMNS` 是列名到类型化字段访问器的声明式映射表。读取数据行、
//! 生成建表语句、绑定写入参数都遍历这一张表。列值为空映射为 `None`，
//! 类型不符则返回 `ClinicError::MalformedRow`，不做静默转换。

use chrono::{DateTime, NaiveDate, Utc};
use clinic_core::{ClinicError, EntityRecord, Result};
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::collections::BTreeMap;

/// 实体表名
pub const ENTITY_TABLE: &str = "entities";

/// 主键列
pub const KEY_COLUMN: &str = "entity_no";

/// 状态列（软删除标记）
pub const STATUS_COLUMN: &str = "status";

/// 类型代码列
pub const TYPE_CODE_COLUMN: &str = "entity_type_code";

/// 参与模糊搜索的列
pub const SEARCHABLE_COLUMNS: &[&str] = &["first_name", "middle_name", "last_name", "patient_no", "id_no"];

/// 列的存储类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Int,
    Bool,
    Date,
    Timestamp,
}

impl FieldKind {
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldKind::Text => "TEXT",
            FieldKind::Int => "INTEGER",
            FieldKind::Bool => "BOOLEAN",
            FieldKind::Date => "DATE",
            FieldKind::Timestamp => "TIMESTAMPTZ",
        }
    }
}

/// 类型化的列值
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Text(String),
    Int(i32),
    Bool(bool),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl ColumnValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            ColumnValue::Text(_) => FieldKind::Text,
            ColumnValue::Int(_) => FieldKind::Int,
            ColumnValue::Bool(_) => FieldKind::Bool,
            ColumnValue::Date(_) => FieldKind::Date,
            ColumnValue::Timestamp(_) => FieldKind::Timestamp,
        }
    }
}

fn type_mismatch(column: &str, expected: FieldKind, found: FieldKind) -> ClinicError {
    ClinicError::malformed(column, format!("expected {:?}, found {:?}", expected, found))
}

trait FromColumn: Sized {
    fn from_column(column: &str, value: ColumnValue) -> Result<Self>;
}

macro_rules! impl_from_column {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl FromColumn for $ty {
                fn from_column(column: &str, value: ColumnValue) -> Result<Self> {
                    match value {
                        ColumnValue::$kind(v) => Ok(v),
                        other => Err(type_mismatch(column, FieldKind::$kind, other.kind())),
                    }
                }
            }
        )*
    };
}

impl_from_column! {
    String => Text,
    i32 => Int,
    bool => Bool,
    NaiveDate => Date,
    DateTime<Utc> => Timestamp,
}

/// 一列的映射：列名、类型以及读写记录字段的访问器
pub struct Column {
    pub name: &'static str,
    pub kind: FieldKind,
    pub get: fn(&EntityRecord) -> Option<ColumnValue>,
    set: fn(&mut EntityRecord, ColumnValue) -> Result<()>,
}

impl std::fmt::Debug for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

macro_rules! entity_columns {
    ($($field:ident : $kind:ident),* $(,)?) => {
        /// 除主键外的全部列，顺序即建表和写入顺序
        pub static ENTITY_COLUMNS: &[Column] = &[
            $(
                Column {
                    name: stringify!($field),
                    kind: FieldKind::$kind,
                    get: |record| record.$field.clone().map(ColumnValue::$kind),
                    set: |record, value| {
                        record.$field = Some(FromColumn::from_column(stringify!($field), value)?);
                        Ok(())
                    },
                },
            )*
        ];
    };
}

entity_columns! {
    patient_no: Text,
    first_name: Text,
    middle_name: Text,
    last_name: Text,
    dob: Date,
    sex: Text,
    entity_type_code: Text,
    id_type: Text,
    id_no: Text,
    marital_status: Text,
    nationality: Text,
    disability: Text,
    remark: Text,
    status_date: Date,
    designation: Text,
    qualification: Text,
    status: Bool,
    dor: Date,
    pat_insured: Bool,
    country_no: Int,
    title: Text,
    file_no: Text,
    department_no: Int,
    company_no: Int,
    branch_no: Int,
    employee_pin_no: Text,
    bank_account_no: Text,
    nssf_no: Text,
    nhif_no: Text,
    employment_type_no: Int,
    age: Int,
    regby: Text,
    next_kin: Text,
    next_kin_mobile: Text,
    next_kin_relationship: Text,
    registered_by: Int,
    modified_by: Int,
    modified_date: Timestamp,
    patient_pay_type: Text,
    father: Text,
    mother: Text,
    staff_no: Text,
    bank_no: Int,
    bank_branch_no: Int,
    mpesa_mobile_no: Text,
    salary_payment_mode: Text,
}

/// 按列名查找映射
pub fn column(name: &str) -> Option<&'static Column> {
    ENTITY_COLUMNS.iter().find(|c| c.name == name)
}

/// 原始数据行：按列名和期望类型读取可空值
pub trait RawRow {
    fn read(&self, column: &str, kind: FieldKind) -> Result<Option<ColumnValue>>;

    fn read_text(&self, column: &str) -> Result<Option<String>> {
        match self.read(column, FieldKind::Text)? {
            Some(value) => String::from_column(column, value).map(Some),
            None => Ok(None),
        }
    }
}

impl RawRow for PgRow {
    fn read(&self, column: &str, kind: FieldKind) -> Result<Option<ColumnValue>> {
        let value = match kind {
            FieldKind::Text => self.try_get::<Option<String>, _>(column)?.map(ColumnValue::Text),
            FieldKind::Int => self.try_get::<Option<i32>, _>(column)?.map(ColumnValue::Int),
            FieldKind::Bool => self.try_get::<Option<bool>, _>(column)?.map(ColumnValue::Bool),
            FieldKind::Date => self.try_get::<Option<NaiveDate>, _>(column)?.map(ColumnValue::Date),
            FieldKind::Timestamp => self
                .try_get::<Option<DateTime<Utc>>, _>(column)?
                .map(ColumnValue::Timestamp),
        };
        Ok(value)
    }
}

/// 将原始数据行映射为实体记录
pub fn map_row<R: RawRow + ?Sized>(row: &R) -> Result<EntityRecord> {
    let entity_no = match row.read(KEY_COLUMN, FieldKind::Int)? {
        Some(value) => i32::from_column(KEY_COLUMN, value)?,
        None => return Err(ClinicError::malformed(KEY_COLUMN, "identifier is null")),
    };

    let mut record = EntityRecord {
        entity_no,
        ..Default::default()
    };
    for column in ENTITY_COLUMNS {
        if let Some(value) = row.read(column.name, column.kind)? {
            (column.set)(&mut record, value)?;
        }
    }
    Ok(record)
}

/// 内存数据行，缺失的列与空值区分开
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryRow {
    values: BTreeMap<String, Option<ColumnValue>>,
}

impl MemoryRow {
    pub fn from_record(record: &EntityRecord) -> Self {
        let mut row = Self::default();
        row.set(KEY_COLUMN, Some(ColumnValue::Int(record.entity_no)));
        for column in ENTITY_COLUMNS {
            row.set(column.name, (column.get)(record));
        }
        row
    }

    pub fn set(&mut self, column: &str, value: Option<ColumnValue>) {
        self.values.insert(column.to_string(), value);
    }

    pub fn remove(&mut self, column: &str) {
        self.values.remove(column);
    }
}

impl RawRow for MemoryRow {
    fn read(&self, column: &str, kind: FieldKind) -> Result<Option<ColumnValue>> {
        match self.values.get(column) {
            None => Err(ClinicError::malformed(column, "column not present in row")),
            Some(None) => Ok(None),
            Some(Some(value)) if value.kind() == kind => Ok(Some(value.clone())),
            Some(Some(value)) => Err(type_mismatch(column, kind, value.kind())),
        }
    }
}
