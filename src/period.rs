// src/period.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quarter-end month tag of a crosswalk release ("03", "06", "09", "12").
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Quarter {
    Mar,
    Jun,
    Sep,
    Dec,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [Quarter::Mar, Quarter::Jun, Quarter::Sep, Quarter::Dec];

    pub fn tag(self) -> &'static str {
        match self {
            Quarter::Mar => "03",
            Quarter::Jun => "06",
            Quarter::Sep => "09",
            Quarter::Dec => "12",
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Quarter {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "03" | "3" => Ok(Quarter::Mar),
            "06" | "6" => Ok(Quarter::Jun),
            "09" | "9" => Ok(Quarter::Sep),
            "12" => Ok(Quarter::Dec),
            other => Err(format!("invalid quarter tag {:?}, expected 03/06/09/12", other)),
        }
    }
}

impl TryFrom<String> for Quarter {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Quarter> for String {
    fn from(q: Quarter) -> Self {
        q.tag().to_string()
    }
}

/// One (year, quarter) unit of crosswalk data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Period {
    pub year: i32,
    pub quarter: Quarter,
}

impl Period {
    pub fn new(year: i32, quarter: Quarter) -> Self {
        Self { year, quarter }
    }

    /// Substitute `{year}` and `{month}` in a URL template.
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{year}", &format!("{:04}", self.year))
            .replace("{month}", self.quarter.tag())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{}", self.year, self.quarter)
    }
}

/// Every period in `start_year..=end_year`, years ascending, quarters in the given order.
/// Empty if `start_year > end_year`.
pub fn periods(start_year: i32, end_year: i32, quarters: &[Quarter]) -> impl Iterator<Item = Period> + '_ {
    (start_year..=end_year)
        .flat_map(move |year| quarters.iter().map(move |&q| Period::new(year, q)))
}
