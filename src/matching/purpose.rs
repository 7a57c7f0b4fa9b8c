//! Payment purpose parsing

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{PurposeReference, NORMALIZED_DATE_FORMAT};

// Dates are digits only; month names ("19 февраля 2025") are not recognized.
static INVOICE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        (?:^|[^\p{L}\p{N}])
        (?:
          (?:сч[её]т|сч\.?|с/ф|invoice)\D*     # invoice prefix
          |inv(?:\.|[^\p{L}\p{N}])\D*         # bare inv must not start a longer word
          |inv
        )
        ([0-9]+)                                # invoice number
        .*?
        (?:от|\bна|from|for|/|\||,)             # separator before the date
        \s*
        ([0-9]{2}[./-][0-9]{2}[./-][0-9]{4})    # invoice date
        ",
    )
    .expect("invoice reference pattern is valid")
});

static DIGIT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+").expect("digit run pattern is valid"));

/// Extract the first invoice number and date cited in a payment purpose
///
/// Returns `None` when the text has no `<prefix> <number> <separator> <date>`
/// sequence, or when the cited date is not a real calendar date.
pub fn extract_number_and_date(purpose: &str) -> Option<PurposeReference> {
    let captures = INVOICE_REFERENCE.captures(purpose)?;
    let number = captures.get(1)?.as_str().to_string();
    let raw_date = captures
        .get(2)?
        .as_str()
        .replace(|c: char| c == '/' || c == '-', ".");
    let date = NaiveDate::parse_from_str(&raw_date, NORMALIZED_DATE_FORMAT).ok()?;

    Some(PurposeReference { number, date })
}

/// Every run of digits in the purpose, in order of appearance
pub fn digit_tokens(purpose: &str) -> impl Iterator<Item = &str> {
    DIGIT_RUN.find_iter(purpose).map(|token| token.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32, month: u32, year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_extracts_reference_from_bank_purpose() {
        let purpose = "Оплата по сч/ф 1020 от 19.02.2025 по договору № Б\\Н от 16.12.2024 за \
                       Закупка поломоечных машин ТР ЮГ в т.ч. НДС 40.487,50";
        let reference = extract_number_and_date(purpose).unwrap();
        assert_eq!(reference.number, "1020");
        assert_eq!(reference.date, date(19, 2, 2025));
        assert_eq!(reference.normalized_date(), "19.02.2025");
    }

    #[test]
    fn test_prefix_variants() {
        let cases = [
            "Оплата по счету №77 от 01.03.2025",
            "Оплата по счёт 77 от 01.03.2025",
            "оплата СЧ. 77 от 01.03.2025",
            "Payment for invoice 77 from 01.03.2025",
            "Payment inv. 77 for 01.03.2025",
        ];
        for purpose in cases {
            let reference = extract_number_and_date(purpose)
                .unwrap_or_else(|| panic!("no reference in {purpose:?}"));
            assert_eq!(reference.number, "77", "{purpose}");
            assert_eq!(reference.date, date(1, 3, 2025), "{purpose}");
        }
    }

    #[test]
    fn test_separators_and_date_forms() {
        let cases = [
            "сч 512/05/06/2024",
            "сч 512 | 05-06-2024",
            "сч 512, 05/06/2024",
            "сч 512 на 05.06.2024",
        ];
        for purpose in cases {
            let reference = extract_number_and_date(purpose)
                .unwrap_or_else(|| panic!("no reference in {purpose:?}"));
            assert_eq!(reference.number, "512", "{purpose}");
            assert_eq!(reference.normalized_date(), "05.06.2024", "{purpose}");
        }
    }

    #[test]
    fn test_first_reference_wins() {
        let reference =
            extract_number_and_date("Оплата по счету 15 от 10.01.2025, счет 16 от 11.01.2025")
                .unwrap();
        assert_eq!(reference.number, "15");
        assert_eq!(reference.date, date(10, 1, 2025));
    }

    #[test]
    fn test_prefix_must_start_a_word() {
        assert!(extract_number_and_date("Расчет 15 от 10.01.2025").is_none());
    }

    #[test]
    fn test_prefix_after_punctuation() {
        let cases = [
            "Оплата (сч/ф 1020 от 19.02.2025)",
            "Оплата,сч 1020 от 19.02.2025",
            "№сч 1020 от 19.02.2025",
            "inv1020 from 19.02.2025",
        ];
        for purpose in cases {
            let reference = extract_number_and_date(purpose)
                .unwrap_or_else(|| panic!("no reference in {purpose:?}"));
            assert_eq!(reference.number, "1020", "{purpose}");
            assert_eq!(reference.date, date(19, 2, 2025), "{purpose}");
        }
    }

    #[test]
    fn test_inv_inside_a_word_is_not_a_prefix() {
        assert!(extract_number_and_date("Inventory 12 from 01.01.2025").is_none());
        assert!(extract_number_and_date("Invest 12 from 01.01.2025").is_none());
    }

    #[test]
    fn test_text_without_reference() {
        assert!(extract_number_and_date("Возврат средств").is_none());
        assert!(extract_number_and_date("").is_none());
        assert!(extract_number_and_date("Оплата по счету 15").is_none());
        assert!(extract_number_and_date("Оплата от 10.01.2025").is_none());
    }

    #[test]
    fn test_impossible_date_is_a_miss() {
        assert!(extract_number_and_date("счет 15 от 31.02.2025").is_none());
    }

    #[test]
    fn test_digit_tokens() {
        let tokens: Vec<&str> = digit_tokens("сч/ф 1020 от 19.02.2025").collect();
        assert_eq!(tokens, vec!["1020", "19", "02", "2025"]);
    }
}
