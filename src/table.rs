//! In-memory tables parsed from downloaded CSV files.

use serde::Serialize;

use crate::error::*;

/// Cell contents that count as missing.
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const TRUE_VALUES: &[&str] = &["True", "TRUE", "true"];
const FALSE_VALUES: &[&str] = &["False", "FALSE", "false"];

/// A non-null cell of an extracted column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Parses UTF-8 CSV with a header row. Records shorter than the header are
    /// padded with nulls; longer ones are rejected.
    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers = rdr.headers()?.clone();
        if headers.is_empty() {
            return Err(Error::MalformedResponse("file has no header row".into()));
        }

        let columns = column_names(headers.iter());
        let width = columns.len();

        let mut rows = Vec::new();
        for (i, record) in rdr.records().enumerate() {
            let record = record?;

            if record.len() > width {
                return Err(Error::MalformedResponse(format!(
                    "record {} has {} fields, the header has {}",
                    i + 1,
                    record.len(),
                    width
                )));
            }

            let mut row: Vec<Option<String>> = record
                .iter()
                .map(|c| (!NA_VALUES.contains(&c)).then(|| c.to_string()))
                .collect();
            row.resize(width, None);
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<Column<'_>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(Column { table: self, index })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> Column<'a> {
    pub fn name(&self) -> &'a str {
        &self.table.columns[self.index]
    }

    /// Cells top to bottom, `None` for missing values.
    pub fn cells(&self) -> impl Iterator<Item = Option<&'a str>> + 'a {
        let Column { table, index } = *self;
        table.rows.iter().map(move |r| r[index].as_deref())
    }

    /// The non-null cells in order, typed by what the whole column holds.
    pub fn non_null(&self) -> Vec<Value> {
        let cells: Vec<&str> = self.cells().flatten().collect();
        infer(&cells)
    }
}

fn infer(cells: &[&str]) -> Vec<Value> {
    all(cells, |c| c.trim().parse().ok().map(Value::Int))
        .or_else(|| all(cells, parse_float))
        .or_else(|| all(cells, parse_bool))
        .unwrap_or_else(|| cells.iter().map(|c| Value::Text(c.to_string())).collect())
}

/// Converts every cell with `f`, or gives up on the first one it rejects.
fn all<F>(cells: &[&str], f: F) -> Option<Vec<Value>>
where
    F: Fn(&str) -> Option<Value>,
{
    cells.iter().map(|&c| f(c)).collect()
}

// Infinities would serialize as JSON null.
fn parse_float(c: &str) -> Option<Value> {
    c.trim()
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Value::Float)
}

fn parse_bool(c: &str) -> Option<Value> {
    if TRUE_VALUES.contains(&c) {
        Some(Value::Bool(true))
    } else if FALSE_VALUES.contains(&c) {
        Some(Value::Bool(false))
    } else {
        None
    }
}

/// Unnamed headers become `Unnamed: <index>`; repeats get a `.1`, `.2`, ... suffix.
fn column_names<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();

    for (i, name) in headers.enumerate() {
        let name = match name {
            "" => format!("Unnamed: {i}"),
            n => n.to_string(),
        };

        let mut candidate = name.clone();
        let mut n = 0;
        while out.contains(&candidate) {
            n += 1;
            candidate = format!("{name}.{n}");
        }
        out.push(candidate);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_nulls_in_order() -> anyhow::Result<()> {
        let t = Table::from_csv(b"Alexa Interaction,Mood\n1,ok\n,bad\n2,ok\nNaN,ok\n3,meh\n")?;
        let col = t.column("Alexa Interaction").expect("column exists");

        assert_eq!(col.non_null(), vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(t.len(), 5);
        Ok(())
    }

    #[test]
    fn all_null_column_is_empty() -> anyhow::Result<()> {
        let t = Table::from_csv(b"a,b\n,1\nNA,2\nnull,3\n")?;
        assert!(t.column("a").expect("column exists").non_null().is_empty());
        Ok(())
    }

    #[test]
    fn column_types() -> anyhow::Result<()> {
        let t = Table::from_csv(b"i,f,b,s\n1,1.5,True,hi\n2,2,false,3\n")?;

        let col = |name: &str| t.column(name).expect("column exists").non_null();
        assert_eq!(col("i"), vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(col("f"), vec![Value::Float(1.5), Value::Float(2.0)]);
        assert_eq!(col("b"), vec![Value::Bool(true), Value::Bool(false)]);
        assert_eq!(col("s"), vec![Value::Text("hi".into()), Value::Text("3".into())]);
        Ok(())
    }

    #[test]
    fn infinities_stay_text() -> anyhow::Result<()> {
        let t = Table::from_csv(b"c,d\n1,1.5\ninf,1e999\n2,2\n")?;

        let c = t.column("c").expect("column exists").non_null();
        assert_eq!(
            c,
            vec![
                Value::Text("1".into()),
                Value::Text("inf".into()),
                Value::Text("2".into())
            ]
        );
        assert_eq!(serde_json::to_string(&c)?, r#"["1","inf","2"]"#);

        let d = t.column("d").expect("column exists").non_null();
        assert!(!serde_json::to_string(&d)?.contains("null"));
        Ok(())
    }

    #[test]
    fn short_records_are_padded() -> anyhow::Result<()> {
        let t = Table::from_csv(b"a,b,c\n1\n2,x,y\n")?;
        let c: Vec<_> = t.column("c").expect("column exists").cells().collect();
        assert_eq!(c, vec![None, Some("y")]);
        Ok(())
    }

    #[test]
    fn long_records_are_rejected() {
        let res = Table::from_csv(b"a,b\n1,2,3\n");
        assert!(matches!(res, Err(Error::MalformedResponse(_))));
    }

    #[test]
    fn empty_file_is_rejected() {
        assert!(matches!(Table::from_csv(b""), Err(Error::MalformedResponse(_))));
    }

    #[test]
    fn header_names() -> anyhow::Result<()> {
        let t = Table::from_csv("\u{feff}x,,x,x\n1,2,3,4\n".as_bytes())?;
        assert_eq!(t.columns(), ["x", "Unnamed: 1", "x.1", "x.2"]);
        assert_eq!(t.column("x.2").expect("column exists").name(), "x.2");
        Ok(())
    }

    #[test]
    fn quoted_fields() -> anyhow::Result<()> {
        let t = Table::from_csv(b"Alexa Interaction\n\"play music, loud\"\n\"\"\n")?;
        assert_eq!(
            t.column("Alexa Interaction").expect("column exists").non_null(),
            vec![Value::Text("play music, loud".into())]
        );
        Ok(())
    }
}
