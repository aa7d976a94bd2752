//! # Sales/Returns Integrity Check
//!
//! Reads generated store_sales and store_returns `.dat` files back and
//! checks the referential properties the generator promises:
//!
//! - every return matches a sale on (ticket number, item key),
//! - a sale with a NULL customer has a return with a NULL customer,
//! - a sale with a known customer has a return with a known customer,
//! - the returned quantity is between 1 and the quantity sold,
//! - no sale line is returned twice.
//!
//! The return/sales ratio is reported too; it should sit near 10%. So are
//! the number of returned sales and the returns per returned sale.

use std::collections::HashMap;
use std::io::BufRead;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FactGenError, Result};
use crate::output::dat::split_line;
use crate::schema::columns::{positions, STORE_RETURNS_COLUMNS, STORE_SALES_COLUMNS};

/// Issues kept verbatim in a report; the rest are only counted.
const MAX_REPORTED_ISSUES: usize = 20;

/// Expected return/sales ratio bounds, as fractions.
pub const EXPECTED_RATIO: (f64, f64) = (0.09, 0.11);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// No sale with the return's ticket and item.
    OrphanReturn,
    /// The sale's customer is NULL but the return's is not.
    NullNotPropagated,
    /// The sale has a customer but the return's is NULL.
    CustomerDropped,
    /// Returned quantity outside `1..=sold`.
    QuantityOutOfRange,
    /// A second return for the same sale line.
    DuplicateReturn,
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            IssueKind::OrphanReturn => "orphan return",
            IssueKind::NullNotPropagated => "NULL customer not propagated",
            IssueKind::CustomerDropped => "customer dropped",
            IssueKind::QuantityOutOfRange => "quantity out of range",
            IssueKind::DuplicateReturn => "sale returned more than once",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub ticket_number: u64,
    pub item_sk: u64,
    pub details: String,
}

/// Result of an integrity check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub total_sales: u64,
    pub total_returns: u64,
    /// Returns that passed every check.
    pub matched: u64,
    /// Distinct sale lines with at least one return.
    pub sales_with_returns: u64,
    /// Returns whose sale line was found, duplicates included.
    pub returns_with_sales: u64,
    pub issue_count: u64,
    /// The first issues found, up to a fixed limit.
    pub issues: Vec<Issue>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.issue_count == 0
    }

    pub fn return_ratio(&self) -> f64 {
        if self.total_sales == 0 {
            0.0
        } else {
            self.total_returns as f64 / self.total_sales as f64
        }
    }

    /// Returns per returned sale line; exactly 1.0 when nothing is duplicated.
    pub fn returns_per_returned_sale(&self) -> f64 {
        if self.sales_with_returns == 0 {
            0.0
        } else {
            self.returns_with_sales as f64 / self.sales_with_returns as f64
        }
    }

    /// Share of returns that failed a check.
    pub fn failure_rate(&self) -> f64 {
        if self.total_returns == 0 {
            0.0
        } else {
            self.issue_count as f64 / self.total_returns as f64
        }
    }

    pub fn ratio_in_range(&self) -> bool {
        let ratio = self.return_ratio();
        ratio >= EXPECTED_RATIO.0 && ratio < EXPECTED_RATIO.1
    }

    /// Human-readable summary for terminal output.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Sales rows:    {}", self.total_sales),
            format!("Return rows:   {}", self.total_returns),
            format!(
                "Return ratio:  {:.2}%{}",
                self.return_ratio() * 100.0,
                if self.ratio_in_range() {
                    ""
                } else {
                    " (outside the expected 9% - 11%)"
                }
            ),
            format!("Returned sales: {}", self.sales_with_returns),
            format!(
                "Returns per returned sale: {:.2}",
                self.returns_per_returned_sale()
            ),
        ];
        if self.is_clean() {
            lines.push(format!("All {} returns match their sales.", self.matched));
            return lines.join("\n");
        }

        lines.push(format!(
            "{} of {} returns failed ({:.2}%):",
            self.issue_count,
            self.total_returns,
            self.failure_rate() * 100.0
        ));
        for issue in &self.issues {
            lines.push(format!(
                "  ! ticket {} item {}: {} ({})",
                issue.ticket_number, issue.item_sk, issue.kind, issue.details
            ));
        }
        if self.issue_count > self.issues.len() as u64 {
            lines.push(format!(
                "  ... and {} more",
                self.issue_count - self.issues.len() as u64
            ));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Clone, Copy)]
struct SaleFacts {
    customer_sk: Option<u64>,
    quantity: i64,
    returns: u32,
}

/// Accumulates sales, then checks returns against them. Sales must all be
/// loaded before the first return is checked.
#[derive(Debug, Default)]
pub struct IntegrityChecker {
    sales: HashMap<(u64, u64), SaleFacts>,
    report: IntegrityReport,
}

fn parse_key(file: &str, line: usize, column: &str, text: &str) -> Result<Option<u64>> {
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<u64>()
        .map(Some)
        .map_err(|e| FactGenError::MalformedRow {
            file: file.to_string(),
            line,
            message: format!("{} '{}': {}", column, text, e),
        })
}

fn required_key(file: &str, line: usize, column: &str, text: &str) -> Result<u64> {
    parse_key(file, line, column, text)?.ok_or_else(|| FactGenError::MalformedRow {
        file: file.to_string(),
        line,
        message: format!("{} is NULL", column),
    })
}

fn parse_quantity(file: &str, line: usize, column: &str, text: &str) -> Result<i64> {
    text.parse::<i64>().map_err(|e| FactGenError::MalformedRow {
        file: file.to_string(),
        line,
        message: format!("{} '{}': {}", column, text, e),
    })
}

fn fields_of<'a>(
    file: &str,
    line_no: usize,
    line: &'a str,
    expected: usize,
) -> Result<Vec<&'a str>> {
    let fields = split_line(line).ok_or_else(|| FactGenError::MalformedRow {
        file: file.to_string(),
        line: line_no,
        message: "missing trailing delimiter".to_string(),
    })?;
    if fields.len() != expected {
        return Err(FactGenError::MalformedRow {
            file: file.to_string(),
            line: line_no,
            message: format!("expected {} fields, found {}", expected, fields.len()),
        });
    }
    Ok(fields)
}

fn check_return(
    sale: &SaleFacts,
    customer: Option<u64>,
    quantity: i64,
) -> Option<(IssueKind, String)> {
    if sale.returns > 1 {
        return Some((
            IssueKind::DuplicateReturn,
            format!("return {} for this line", sale.returns),
        ));
    }
    match (sale.customer_sk, customer) {
        (None, Some(c)) => Some((
            IssueKind::NullNotPropagated,
            format!("return customer {}", c),
        )),
        (Some(c), None) => Some((IssueKind::CustomerDropped, format!("sale customer {}", c))),
        _ if !(1..=sale.quantity).contains(&quantity) => Some((
            IssueKind::QuantityOutOfRange,
            format!("returned {} of {}", quantity, sale.quantity),
        )),
        _ => None,
    }
}

fn read_error(file: &str, e: std::io::Error) -> FactGenError {
    FactGenError::Output {
        message: format!("reading {}", file),
        source: e,
    }
}

impl IntegrityChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the sales rows of one file. `file` names it in errors.
    pub fn load_sales<R: BufRead>(&mut self, reader: R, file: &str) -> Result<()> {
        let before = self.report.total_sales;
        for (n, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| read_error(file, e))?;
            if line.is_empty() {
                continue;
            }
            let line_no = n + 1;
            let f = fields_of(file, line_no, &line, STORE_SALES_COLUMNS.len())?;
            let ticket = required_key(file, line_no, "ss_ticket_number", f[positions::SS_TICKET_NUMBER])?;
            let item = required_key(file, line_no, "ss_item_sk", f[positions::SS_ITEM_SK])?;
            let facts = SaleFacts {
                customer_sk: parse_key(file, line_no, "ss_customer_sk", f[positions::SS_CUSTOMER_SK])?,
                quantity: parse_quantity(file, line_no, "ss_quantity", f[positions::SS_QUANTITY])?,
                returns: 0,
            };
            self.sales.insert((ticket, item), facts);
            self.report.total_sales += 1;
        }
        debug!(
            "Loaded {} sales rows from {}",
            self.report.total_sales - before,
            file
        );
        Ok(())
    }

    /// Check the returns rows of one file against the loaded sales.
    pub fn check_returns<R: BufRead>(&mut self, reader: R, file: &str) -> Result<()> {
        for (n, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| read_error(file, e))?;
            if line.is_empty() {
                continue;
            }
            let line_no = n + 1;
            let f = fields_of(file, line_no, &line, STORE_RETURNS_COLUMNS.len())?;
            let ticket = required_key(file, line_no, "sr_ticket_number", f[positions::SR_TICKET_NUMBER])?;
            let item = required_key(file, line_no, "sr_item_sk", f[positions::SR_ITEM_SK])?;
            let customer =
                parse_key(file, line_no, "sr_customer_sk", f[positions::SR_CUSTOMER_SK])?;
            let quantity = parse_quantity(
                file,
                line_no,
                "sr_return_quantity",
                f[positions::SR_RETURN_QUANTITY],
            )?;
            self.report.total_returns += 1;

            let issue = match self.sales.get_mut(&(ticket, item)) {
                None => Some((IssueKind::OrphanReturn, "no matching sale".to_string())),
                Some(sale) => {
                    sale.returns += 1;
                    self.report.returns_with_sales += 1;
                    if sale.returns == 1 {
                        self.report.sales_with_returns += 1;
                    }
                    check_return(sale, customer, quantity)
                }
            };
            match issue {
                None => self.report.matched += 1,
                Some((kind, details)) => {
                    self.report.issue_count += 1;
                    if self.report.issues.len() < MAX_REPORTED_ISSUES {
                        self.report.issues.push(Issue {
                            kind,
                            ticket_number: ticket,
                            item_sk: item,
                            details,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn finish(self) -> IntegrityReport {
        let report = self.report;
        if report.total_sales > 0 && !report.ratio_in_range() {
            warn!(
                "Return/sales ratio {:.2}% is outside the expected 9% - 11%",
                report.return_ratio() * 100.0
            );
        }
        report
    }
}
