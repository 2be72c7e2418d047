//! Company name extraction from the EDGAR browse page.

use scraper::{Html, Selector};

/// Element carrying the company display name.
const COMPANY_NAME_SELECTOR: &str = ".companyName";

/// Trailing link text EDGAR appends after the CIK.
const BOILERPLATE: &[&str] = &["(see all company filings)"];

/// Extracts the company display name from a browse page.
///
/// Takes the first `.companyName` element, cuts everything from the
/// `CIK#` marker on and strips link boilerplate. Returns `None` when the
/// element is missing or empty.
#[must_use]
pub fn parse_company_name(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(COMPANY_NAME_SELECTOR).ok()?;
    let element = document.select(&selector).next()?;

    let text: String = element.text().collect();
    let mut name = strip_cik_tail(&text).to_string();
    for boilerplate in BOILERPLATE {
        name = name.replace(boilerplate, "");
    }

    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    (!name.is_empty()).then_some(name)
}

/// Cuts at the first "CIK" followed by optional spaces and '#'.
fn strip_cik_tail(text: &str) -> &str {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find("CIK") {
        let start = search_from + offset;
        let rest = text[start + 3..].trim_start();
        if rest.starts_with('#') {
            return &text[..start];
        }
        search_from = start + 3;
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    const BROWSE_PAGE: &str = r#"
        <html><body>
        <div class="companyInfo">
          <span class="companyName">APPLE INC <acronym title="Central Index Key">CIK</acronym>#: <a href="/cgi-bin/browse-edgar?action=getcompany&amp;CIK=0000320193">0000320193 (see all company filings)</a></span>
          <p class="identInfo">SIC: 3571</p>
        </div>
        </body></html>
    "#;

    #[test]
    fn test_parse_company_name() {
        assert_eq!(parse_company_name(BROWSE_PAGE).as_deref(), Some("APPLE INC"));
    }

    #[test]
    fn test_first_element_wins() {
        let html = r#"<span class="companyName">FIRST CORP</span><span class="companyName">SECOND CORP</span>"#;
        assert_eq!(parse_company_name(html).as_deref(), Some("FIRST CORP"));
    }

    #[test]
    fn test_boilerplate_without_cik_marker() {
        let html = r#"<span class="companyName">OLD HOLDINGS LLC (see all company filings)</span>"#;
        assert_eq!(parse_company_name(html).as_deref(), Some("OLD HOLDINGS LLC"));
    }

    #[test]
    fn test_missing_or_empty() {
        assert!(parse_company_name("<html><body>No matching CIK.</body></html>").is_none());
        assert!(parse_company_name(r#"<span class="companyName"> </span>"#).is_none());
        assert!(parse_company_name("").is_none());
    }

    #[test]
    fn test_strip_cik_tail() {
        assert_eq!(strip_cik_tail("ACME CIK #: 1"), "ACME ");
        assert_eq!(strip_cik_tail("CIKTRON INC"), "CIKTRON INC");
    }
}
