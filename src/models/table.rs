//! 上游表格数据
//!
//! A股数据源返回的都是带列名的表格（Tushare Pro 的 `{fields, items}` 结构），
//! 这里统一成 `Table`，由字段模式（见 `schema`）转换成输出记录。

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(rename = "fields")]
    pub columns: Vec<String>,
    #[serde(rename = "items")]
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 列名查找，忽略大小写
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// 取某行某列的值，缺列或缺值返回 None
    pub fn cell(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_tushare_shape() {
        let data = json!({
            "fields": ["ts_code", "symbol", "name"],
            "items": [["600000.SH", "600000", "浦发银行"]]
        });
        let table: Table = serde_json::from_value(data).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.column_index("TS_CODE"), Some(0));
        assert_eq!(table.cell(0, 2), Some(&json!("浦发银行")));
        assert_eq!(table.cell(0, 3), None);
    }
}
