//! Central Bank of Russia daily XML feed.
//!
//! Format:
//! ```text
//! <?xml version="1.0" encoding="windows-1251"?>
//! <ValCurs Date="02.03.2024" name="Foreign Currency Market">
//!   <Valute ID="R01235">
//!     <NumCode>840</NumCode><CharCode>USD</CharCode><Nominal>1</Nominal>
//!     <Name>Доллар США</Name><Value>91,6918</Value>
//!   </Valute>
//!   ...
//! </ValCurs>
//! ```
//! Values use a decimal comma and are quoted per `Nominal` units.

use chrono::NaiveDate;
use encoding_rs::Encoding;
use homebudget_core::{Currency, CurrencyCode, HomebudgetError, RateTable, Result};
use regex::bytes::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

use super::{RateSource, feed_url};
use crate::http::HttpClient;

pub const DEFAULT_URL: &str = "http://www.cbr.ru/scripts/XML_daily.asp?date_req={date}";
pub const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Deserialize)]
struct ValCurs {
    #[serde(rename = "@Date", default)]
    date: Option<String>,
    #[serde(rename = "Valute", default)]
    valutes: Vec<Valute>,
}

#[derive(Debug, Deserialize)]
struct Valute {
    #[serde(rename = "NumCode")]
    num_code: String,
    #[serde(rename = "CharCode")]
    char_code: String,
    #[serde(rename = "Nominal")]
    nominal: String,
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Debug, Clone)]
pub struct CbrXmlSource {
    http: HttpClient,
    url_template: String,
}

impl CbrXmlSource {
    pub fn new(http: HttpClient, url_template: impl Into<String>) -> Self {
        Self {
            http,
            url_template: url_template.into(),
        }
    }
}

impl RateSource for CbrXmlSource {
    fn name(&self) -> &str {
        "cbr-xml"
    }

    async fn fetch_raw(&self, date: NaiveDate) -> Result<Vec<u8>> {
        let url = feed_url(&self.url_template, date, DATE_FORMAT);
        log::debug!("fetching CBR rates for {date} from {url}");
        self.http.get_bytes(&url).await
    }

    fn parse(&self, date: NaiveDate, raw: &[u8]) -> Result<RateTable> {
        parse_cbr_xml(date, raw)
    }
}

/// Decode a CBR payload into a rate table for `date`.
///
/// The character set comes from the XML declaration; a payload without one
/// is read as UTF-8. Currencies outside the reference set are skipped.
pub fn parse_cbr_xml(date: NaiveDate, raw: &[u8]) -> Result<RateTable> {
    let text = decode_payload(raw)?;
    let doc: ValCurs = quick_xml::de::from_str(&text)
        .map_err(|e| HomebudgetError::Decode(format!("invalid CBR XML: {e}")))?;

    if doc.valutes.is_empty() {
        return Err(HomebudgetError::Decode(format!(
            "CBR payload for {date} has no Valute entries"
        )));
    }
    if let Some(published) = &doc.date {
        log::debug!("CBR table requested for {date}, published as {published}");
    }

    let mut currencies = Vec::new();
    for valute in &doc.valutes {
        let Some(code) = CurrencyCode::from_code(valute.char_code.trim()) else {
            continue;
        };
        currencies.push(valute_to_currency(code, valute)?);
    }

    Ok(RateTable::new(date, currencies))
}

fn valute_to_currency(code: CurrencyCode, valute: &Valute) -> Result<Currency> {
    let num_code = valute
        .num_code
        .trim()
        .parse::<u16>()
        .map_err(|e| HomebudgetError::Decode(format!("{code}: bad NumCode {:?}: {e}", valute.num_code)))?;
    let nominal = valute
        .nominal
        .trim()
        .parse::<u32>()
        .map_err(|e| HomebudgetError::Decode(format!("{code}: bad Nominal {:?}: {e}", valute.nominal)))?;
    let value = Decimal::from_str(&valute.value.trim().replace(',', "."))
        .map_err(|e| HomebudgetError::Decode(format!("{code}: bad Value {:?}: {e}", valute.value)))?;

    Currency::from_quote(code, num_code, value, nominal)
}

fn decode_payload(raw: &[u8]) -> Result<String> {
    let decl_re = Regex::new(r#"^\s*<\?xml[^>]*encoding\s*=\s*["']([A-Za-z0-9._-]+)["']"#)
        .map_err(|e| HomebudgetError::Decode(e.to_string()))?;
    let encoding = match decl_re.captures(raw) {
        Some(caps) => Encoding::for_label(&caps[1]).ok_or_else(|| {
            HomebudgetError::Decode(format!(
                "unsupported charset: {}",
                String::from_utf8_lossy(&caps[1])
            ))
        })?,
        None => encoding_rs::UTF_8,
    };

    let (text, _, had_errors) = encoding.decode(raw);
    if had_errors {
        return Err(HomebudgetError::Decode(format!(
            "payload is not valid {}",
            encoding.name()
        )));
    }
    Ok(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="windows-1251"?>
<ValCurs Date="02.03.2024" name="Foreign Currency Market">
<Valute ID="R01035"><NumCode>826</NumCode><CharCode>GBP</CharCode><Nominal>1</Nominal><Name>Фунт стерлингов Соединенного королевства</Name><Value>115,7241</Value><VunitRate>115,7241</VunitRate></Valute>
<Valute ID="R01239"><NumCode>978</NumCode><CharCode>EUR</CharCode><Nominal>1</Nominal><Name>Евро</Name><Value>99,1919</Value><VunitRate>99,1919</VunitRate></Valute>
<Valute ID="R01235"><NumCode>840</NumCode><CharCode>USD</CharCode><Nominal>1</Nominal><Name>Доллар США</Name><Value>91,6918</Value><VunitRate>91,6918</VunitRate></Valute>
<Valute ID="R01700J"><NumCode>949</NumCode><CharCode>TRY</CharCode><Nominal>10</Nominal><Name>Турецких лир</Name><Value>29,2810</Value><VunitRate>2,9281</VunitRate></Valute>
<Valute ID="R01805F"><NumCode>941</NumCode><CharCode>RSD</CharCode><Nominal>100</Nominal><Name>Сербских динаров</Name><Value>84,9734</Value><VunitRate>0,849734</VunitRate></Valute>
<Valute ID="R01820"><NumCode>392</NumCode><CharCode>JPY</CharCode><Nominal>100</Nominal><Name>Японских иен</Name><Value>61,0000</Value><VunitRate>0,61</VunitRate></Valute>
</ValCurs>"#;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
    }

    fn windows_1251(text: &str) -> Vec<u8> {
        let (bytes, _, had_errors) = encoding_rs::WINDOWS_1251.encode(text);
        assert!(!had_errors);
        bytes.into_owned()
    }

    #[test]
    fn test_parse_windows_1251_payload() {
        let table = parse_cbr_xml(date(), &windows_1251(SAMPLE)).unwrap();

        assert_eq!(table.date, date());
        // five reference currencies plus RUB, JPY skipped
        assert_eq!(table.len(), 6);
        assert_eq!(table.get(CurrencyCode::USD).unwrap().rate, dec("91.6918"));
        assert_eq!(table.get(CurrencyCode::EUR).unwrap().num_code, 978);
        assert_eq!(table.get(CurrencyCode::RUB).unwrap().rate, Decimal::ONE);
    }

    #[test]
    fn test_nominal_divides_value() {
        let table = parse_cbr_xml(date(), &windows_1251(SAMPLE)).unwrap();
        assert_eq!(table.get(CurrencyCode::RSD).unwrap().rate, dec("0.849734"));
        assert_eq!(table.get(CurrencyCode::TRY).unwrap().rate, dec("2.9281"));
    }

    #[test]
    fn test_utf8_without_declaration() {
        let body = SAMPLE.split_once("?>").unwrap().1;
        let table = parse_cbr_xml(date(), body.as_bytes()).unwrap();
        assert!(table.contains(CurrencyCode::GBP));
    }

    #[test]
    fn test_unknown_charset_rejected() {
        let body = SAMPLE.replace("windows-1251", "x-klingon");
        let err = parse_cbr_xml(date(), body.as_bytes()).unwrap_err();
        assert!(matches!(err, HomebudgetError::Decode(msg) if msg.contains("x-klingon")));
    }

    #[test]
    fn test_malformed_xml_rejected() {
        let err = parse_cbr_xml(date(), b"<ValCurs><Valute>").unwrap_err();
        assert!(matches!(err, HomebudgetError::Decode(_)));
    }

    #[test]
    fn test_empty_table_rejected() {
        let body = r#"<?xml version="1.0" encoding="windows-1251"?><ValCurs Date="02.03.2024"></ValCurs>"#;
        let err = parse_cbr_xml(date(), body.as_bytes()).unwrap_err();
        assert!(matches!(err, HomebudgetError::Decode(_)));
    }

    #[test]
    fn test_bad_value_rejected() {
        let body = SAMPLE.replace("91,6918</Value>", "n/a</Value>");
        let err = parse_cbr_xml(date(), &windows_1251(&body)).unwrap_err();
        assert!(matches!(err, HomebudgetError::Decode(msg) if msg.contains("USD")));
    }

    #[test]
    fn test_missing_reference_currency_is_lookup_error() {
        let body: String = SAMPLE
            .lines()
            .filter(|line| !line.contains("<CharCode>GBP"))
            .collect::<Vec<_>>()
            .join("\n");
        let table = parse_cbr_xml(date(), &windows_1251(&body)).unwrap();
        assert!(matches!(
            table.get(CurrencyCode::GBP),
            Err(HomebudgetError::CurrencyNotFound { code: CurrencyCode::GBP, .. })
        ));
    }
}
