use std::fmt;

/// (code, full name, state FIPS prefix)
const REGIONS: [(&str, &str, &str); 54] = [
    ("AL", "Alabama", "01"),
    ("AK", "Alaska", "02"),
    ("AZ", "Arizona", "04"),
    ("AR", "Arkansas", "05"),
    ("CA", "California", "06"),
    ("CO", "Colorado", "08"),
    ("CT", "Connecticut", "09"),
    ("DE", "Delaware", "10"),
    ("FL", "Florida", "12"),
    ("GA", "Georgia", "13"),
    ("HI", "Hawaii", "15"),
    ("ID", "Idaho", "16"),
    ("IL", "Illinois", "17"),
    ("IN", "Indiana", "18"),
    ("IA", "Iowa", "19"),
    ("KS", "Kansas", "20"),
    ("KY", "Kentucky", "21"),
    ("LA", "Louisiana", "22"),
    ("ME", "Maine", "23"),
    ("MD", "Maryland", "24"),
    ("MA", "Massachusetts", "25"),
    ("MI", "Michigan", "26"),
    ("MN", "Minnesota", "27"),
    ("MS", "Mississippi", "28"),
    ("MO", "Missouri", "29"),
    ("MT", "Montana", "30"),
    ("NE", "Nebraska", "31"),
    ("NV", "Nevada", "32"),
    ("NH", "New Hampshire", "33"),
    ("NJ", "New Jersey", "34"),
    ("NM", "New Mexico", "35"),
    ("NY", "New York", "36"),
    ("NC", "North Carolina", "37"),
    ("ND", "North Dakota", "38"),
    ("OH", "Ohio", "39"),
    ("OK", "Oklahoma", "40"),
    ("OR", "Oregon", "41"),
    ("PA", "Pennsylvania", "42"),
    ("RI", "Rhode Island", "44"),
    ("SC", "South Carolina", "45"),
    ("SD", "South Dakota", "46"),
    ("TN", "Tennessee", "47"),
    ("TX", "Texas", "48"),
    ("UT", "Utah", "49"),
    ("VT", "Vermont", "50"),
    ("VA", "Virginia", "51"),
    ("WA", "Washington", "53"),
    ("WV", "West Virginia", "54"),
    ("WI", "Wisconsin", "55"),
    ("WY", "Wyoming", "56"),
    ("DC", "District of Columbia", "11"),
    ("PR", "Puerto Rico", "72"),
    ("GU", "Guam", "66"),
    ("VI", "U.S. Virgin Islands", "78"),
];

/// Top-level region (state or territory) from the fixed enumeration.
/// Ordering follows the code string, so maps keyed by `RegionCode`
/// iterate alphabetically.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionCode(u8);

impl RegionCode {
    /// Trims and uppercases `raw`; anything outside the enumeration is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let code = raw.trim().to_ascii_uppercase();
        REGIONS
            .iter()
            .position(|(c, _, _)| *c == code)
            .map(|i| RegionCode(i as u8))
    }

    pub fn all() -> impl Iterator<Item = RegionCode> {
        (0..REGIONS.len()).map(|i| RegionCode(i as u8))
    }

    pub fn as_str(self) -> &'static str {
        REGIONS[self.0 as usize].0
    }

    pub fn name(self) -> &'static str {
        REGIONS[self.0 as usize].1
    }

    pub fn fips_prefix(self) -> &'static str {
        REGIONS[self.0 as usize].2
    }

    /// Whether a county FIPS id (padded or not) belongs to this region.
    pub fn contains_fips(self, fips: &str) -> bool {
        pad_fips(fips).starts_with(self.fips_prefix())
    }
}

impl PartialOrd for RegionCode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RegionCode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegionCode({})", self.as_str())
    }
}

/// County FIPS ids arrive as numbers or short strings ("6037"); pad to 5 digits.
pub fn pad_fips(raw: &str) -> String {
    format!("{:0>5}", raw.trim())
}
