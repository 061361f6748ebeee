//! Sequential field reader over one comma separated record.

use crate::circuit::NodeId;
use crate::error::{Result, SimError};

use super::units::parse_value;

/// Reads the fields of a record in order.
pub struct RecordReader<'a> {
    fields: std::str::Split<'a, char>,
    line: usize,
}

impl<'a> RecordReader<'a> {
    /// Create a reader over `record`, reporting errors against `line`.
    pub fn new(record: &'a str, line: usize) -> Self {
        Self {
            fields: record.split(','),
            line,
        }
    }

    /// Line number used in error reports.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Next raw field, trimmed.
    pub fn read(&mut self) -> Result<&'a str> {
        match self.fields.next().map(str::trim) {
            Some(field) if !field.is_empty() => Ok(field),
            _ => Err(SimError::parse(self.line, "record ended early")),
        }
    }

    /// Next field as a unit-prefixed number.
    pub fn read_number(&mut self) -> Result<f64> {
        let field = self.read()?;
        parse_value(field)
            .ok_or_else(|| SimError::parse(self.line, format!("invalid number '{field}'")))
    }

    /// Next field as a node index.
    pub fn read_node(&mut self) -> Result<NodeId> {
        let field = self.read()?;
        field
            .parse::<usize>()
            .map(NodeId)
            .map_err(|_| SimError::parse(self.line, format!("invalid node index '{field}'")))
    }

    /// Fail if anything other than the trailing separator is left.
    pub fn finish(mut self) -> Result<()> {
        match self.fields.find(|f| !f.trim().is_empty()) {
            None => Ok(()),
            Some(extra) => Err(SimError::parse(
                self.line,
                format!("unexpected trailing field '{}'", extra.trim()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_in_order() {
        let mut r = RecordReader::new("vs,1,0,0,5,60,", 3);
        assert_eq!(r.read().unwrap(), "vs");
        assert_eq!(r.read_node().unwrap(), NodeId(1));
        assert_eq!(r.read_node().unwrap(), NodeId(0));
        assert_eq!(r.read().unwrap(), "0");
        assert_eq!(r.read_number().unwrap(), 5.0);
        assert_eq!(r.read_number().unwrap(), 60.0);
        assert!(r.finish().is_ok());
    }

    #[test]
    fn test_errors_carry_line() {
        let mut r = RecordReader::new("r,x", 7);
        r.read().unwrap();
        let err = r.read_node().unwrap_err();
        assert!(matches!(err, SimError::Parse { line: 7, .. }));
        assert!(r.read().is_err());
    }

    #[test]
    fn test_trailing_field_rejected() {
        let mut r = RecordReader::new("1,2,3", 1);
        r.read().unwrap();
        assert!(r.finish().is_err());
    }
}
