use serde::{Deserialize, Serialize};

/// Currency display rules. Defaults match how the storefront shows prices in
/// Vietnamese đồng (`1.234.000 ₫`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyFormat {
    pub symbol: String,
    pub code: String,
    pub thousands_separator: String,
    pub decimal_separator: String,
    pub decimals: u8,
    pub symbol_after: bool,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self {
            symbol: "₫".to_string(),
            code: "VND".to_string(),
            thousands_separator: ".".to_string(),
            decimal_separator: ",".to_string(),
            decimals: 0,
            symbol_after: true,
        }
    }
}

fn group_digits(digits: &str, sep: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * sep.len());
    let lead = digits.len() % 3;
    for (i, ch) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - lead) % 3 == 0 {
            out.push_str(sep);
        }
        out.push(ch);
    }
    out
}

impl CurrencyFormat {
    pub fn format(&self, amount: f64) -> String {
        let decimals = usize::from(self.decimals.min(6));
        let fixed = format!("{:.*}", decimals, amount.abs());
        let (int_part, frac_part) = match fixed.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (fixed.as_str(), None),
        };

        let mut number = group_digits(int_part, &self.thousands_separator);
        if let Some(frac) = frac_part {
            number.push_str(&self.decimal_separator);
            number.push_str(frac);
        }
        let sign = if amount < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
            "-"
        } else {
            ""
        };

        if self.symbol_after {
            format!("{sign}{number} {}", self.symbol)
        } else {
            format!("{sign}{}{number}", self.symbol)
        }
    }

    /// Absent and zero prices show the fallback label instead of an amount.
    pub fn label(&self, price: Option<f64>, fallback: &str) -> String {
        match price {
            Some(p) if p.is_finite() && p != 0.0 => self.format(p),
            _ => fallback.to_string(),
        }
    }
}
