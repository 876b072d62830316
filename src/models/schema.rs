//! 字段模式
//!
//! 每种记录（代码表、实时报价、分笔、分钟线、排行榜）用一份声明式的字段清单描述，
//! 统一执行同一套取值规则：
//! - 数值 → 数值；可解析的数值字符串 → 解析后的数值
//! - 缺失、`null`、`"-"`、空串、NaN、无法解析 → `null`（不补零）
//! - 非空文本字段缺失时为 `""`

use serde_json::{Map, Number, Value};

use super::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Float,
    Int,
    Text,
}

/// 单个输出字段的声明
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// 输出字段名
    pub name: &'static str,
    /// 上游列名（按顺序尝试，忽略大小写）；为空时使用 `name`
    pub columns: &'static [&'static str],
    pub kind: FieldKind,
    pub nullable: bool,
}

impl FieldSpec {
    pub const fn float(name: &'static str, columns: &'static [&'static str]) -> Self {
        Self { name, columns, kind: FieldKind::Float, nullable: true }
    }

    pub const fn int(name: &'static str, columns: &'static [&'static str]) -> Self {
        Self { name, columns, kind: FieldKind::Int, nullable: true }
    }

    pub const fn text(name: &'static str, columns: &'static [&'static str]) -> Self {
        Self { name, columns, kind: FieldKind::Text, nullable: true }
    }

    /// 缺失时输出空字符串的文本字段
    pub const fn required_text(name: &'static str, columns: &'static [&'static str]) -> Self {
        Self { name, columns, kind: FieldKind::Text, nullable: false }
    }

    fn convert(&self, raw: Option<&Value>) -> Value {
        let value = match self.kind {
            FieldKind::Float => raw.and_then(to_f64).and_then(Number::from_f64).map(Value::Number),
            FieldKind::Int => raw.and_then(to_i64).map(|v| Value::Number(v.into())),
            FieldKind::Text => raw.and_then(to_text).map(Value::String),
        };
        match value {
            Some(v) => v,
            None if !self.nullable && self.kind == FieldKind::Text => Value::String(String::new()),
            None => Value::Null,
        }
    }
}

/// 按字段模式把表格转换为记录列表
pub fn extract(table: &Table, schema: &[FieldSpec]) -> Vec<Map<String, Value>> {
    let indices: Vec<Option<usize>> = schema
        .iter()
        .map(|spec| {
            if spec.columns.is_empty() {
                table.column_index(spec.name)
            } else {
                spec.columns.iter().find_map(|c| table.column_index(c))
            }
        })
        .collect();

    (0..table.len())
        .map(|row| {
            schema
                .iter()
                .zip(&indices)
                .map(|(spec, idx)| {
                    let raw = idx.and_then(|i| table.cell(row, i));
                    (spec.name.to_string(), spec.convert(raw))
                })
                .collect()
        })
        .collect()
}

/// 读取数值，NaN/无穷/非数值字符串返回 None
pub fn to_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|v| v.is_finite()).map(|v| v as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v as i64))
        }
        _ => None,
    }
}

fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
