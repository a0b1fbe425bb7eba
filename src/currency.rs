use crate::types::CurrencyCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolPosition {
    Prefix,
    Suffix,
}

#[derive(Debug, Clone, Copy)]
struct CurrencyFormat {
    code: &'static str,
    symbol: &'static str,
    position: SymbolPosition,
    group: char,
    decimal: char,
}

const USD: CurrencyFormat = CurrencyFormat {
    code: "USD",
    symbol: "$",
    position: SymbolPosition::Prefix,
    group: ',',
    decimal: '.',
};

const FORMATS: [CurrencyFormat; 4] = [
    USD,
    CurrencyFormat {
        code: "EUR",
        symbol: "€",
        position: SymbolPosition::Suffix,
        group: '.',
        decimal: ',',
    },
    CurrencyFormat {
        code: "UAH",
        symbol: "₴",
        position: SymbolPosition::Suffix,
        group: ' ',
        decimal: ',',
    },
    CurrencyFormat {
        code: "PLN",
        symbol: "zł",
        position: SymbolPosition::Suffix,
        group: ' ',
        decimal: ',',
    },
];

fn format_for(currency: &CurrencyCode) -> CurrencyFormat {
    FORMATS
        .iter()
        .find(|f| f.code == currency.as_str())
        .copied()
        .unwrap_or(USD)
}

/// Currency codes with a dedicated display format, in picker order.
pub fn supported_currencies() -> impl Iterator<Item = &'static str> {
    FORMATS.iter().map(|f| f.code)
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

/// Formats `amount` with two fraction digits in the display convention of
/// `currency`. Codes without a dedicated format render like USD.
pub fn format_amount(amount: f64, currency: &CurrencyCode) -> String {
    let format = format_for(currency);
    let amount = if amount.is_finite() { amount } else { 0.0 };

    let fixed = format!("{:.2}", amount.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let negative = amount < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0');
    let sign = if negative { "-" } else { "" };
    let number = format!(
        "{}{}{fraction}",
        group_digits(whole, format.group),
        format.decimal
    );

    match format.position {
        SymbolPosition::Prefix => format!("{sign}{}{number}", format.symbol),
        SymbolPosition::Suffix => format!("{sign}{number} {}", format.symbol),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(value: &str) -> CurrencyCode {
        CurrencyCode::parse(value).unwrap()
    }

    #[test]
    fn formats_each_supported_currency() {
        assert_eq!(format_amount(1234.56, &code("USD")), "$1,234.56");
        assert_eq!(format_amount(1234.56, &code("EUR")), "1.234,56 €");
        assert_eq!(format_amount(1234.56, &code("UAH")), "1 234,56 ₴");
        assert_eq!(format_amount(1234.56, &code("PLN")), "1 234,56 zł");
    }

    #[test]
    fn groups_large_and_small_values() {
        assert_eq!(format_amount(0.5, &code("USD")), "$0.50");
        assert_eq!(format_amount(999.999, &code("USD")), "$1,000.00");
        assert_eq!(format_amount(1234567.0, &code("EUR")), "1.234.567,00 €");
    }

    #[test]
    fn negative_amounts_get_leading_sign() {
        assert_eq!(format_amount(-42.1, &code("USD")), "-$42.10");
        assert_eq!(format_amount(-1500.0, &code("PLN")), "-1 500,00 zł");
        assert_eq!(format_amount(-0.001, &code("USD")), "$0.00");
    }

    #[test]
    fn unknown_codes_and_non_finite_values_fall_back() {
        assert_eq!(format_amount(10.0, &code("gbp")), "$10.00");
        assert_eq!(format_amount(f64::NAN, &code("EUR")), "0,00 €");
        assert_eq!(format_amount(f64::INFINITY, &code("USD")), "$0.00");
    }

    #[test]
    fn supported_currencies_lists_default_first() {
        let codes: Vec<_> = supported_currencies().collect();
        assert_eq!(codes, ["USD", "EUR", "UAH", "PLN"]);
    }
}
