//! XML provider responses.
//!
//! A naive document-to-map conversion: every child of the `<oembed>` root
//! becomes one entry whose value is the child's text content, whitespace
//! included. Documents with any other root yield no entries. Repeated or
//! nested structures are not represented.

use anyhow::Result;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use super::{coerce_scalar, Formatter, Metadata};

/// Decodes `xml` provider responses (`<oembed><type>video</type>...</oembed>`).
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlFormatter;

impl XmlFormatter {
    /// Format tag this formatter registers under.
    pub const NAME: &'static str = "xml";
}

impl Formatter for XmlFormatter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn format(&self, body: &str) -> Result<Metadata> {
        let mut reader = Reader::from_str(body);

        let mut data = Metadata::new();
        let mut depth = 0usize;
        let mut in_oembed = false;
        let mut current: Option<String> = None;
        let mut text = String::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    depth += 1;
                    if depth == 1 {
                        in_oembed = element_name(e.name().as_ref()) == ROOT;
                    } else if depth == 2 && in_oembed {
                        current = Some(element_name(e.name().as_ref()));
                        text.clear();
                    }
                }
                Event::End(_) => {
                    if depth == 2 {
                        if let Some(name) = current.take() {
                            data.insert(name, coerce_scalar(&text));
                        }
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Empty(e) => {
                    if depth == 1 && in_oembed {
                        data.insert(element_name(e.name().as_ref()), coerce_scalar(""));
                    }
                }
                Event::Text(t) => {
                    if depth >= 2 {
                        text.push_str(&t.unescape()?);
                    }
                }
                Event::CData(c) => {
                    if depth >= 2 {
                        text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(data)
    }
}

const ROOT: &str = "oembed";

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FLICKR: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>
<oembed>
	<version>1.0</version>
	<type>photo</type>
	<title>Bacon Lollys</title>
	<width>500</width>
	<height>375</height>
	<url>http://farm4.static.flickr.com/3040/2362225867_4a87ab8baf.jpg</url>
</oembed>"#;

    #[test]
    fn decodes_children_of_root() {
        let data = XmlFormatter.format(FLICKR).unwrap();
        assert_eq!(data["type"], json!("photo"));
        assert_eq!(
            data["url"],
            json!("http://farm4.static.flickr.com/3040/2362225867_4a87ab8baf.jpg")
        );
    }

    #[test]
    fn coerces_numbers() {
        let data = XmlFormatter.format(FLICKR).unwrap();
        assert_eq!(data["width"], json!(500));
        assert_eq!(data["version"], json!(1.0));
    }

    #[test]
    fn unescapes_entities_in_html() {
        let body = "<oembed><html>&lt;embed src=&quot;x&quot;/&gt;</html></oembed>";
        let data = XmlFormatter.format(body).unwrap();
        assert_eq!(data["html"], json!(r#"<embed src="x"/>"#));
    }

    #[test]
    fn reads_cdata() {
        let body = "<oembed><html><![CDATA[<b>bar</b>]]></html></oembed>";
        let data = XmlFormatter.format(body).unwrap();
        assert_eq!(data["html"], json!("<b>bar</b>"));
    }

    #[test]
    fn empty_elements_are_empty_strings() {
        let data = XmlFormatter.format("<oembed><title/></oembed>").unwrap();
        assert_eq!(data["title"], json!(""));
    }

    #[test]
    fn keeps_surrounding_whitespace() {
        let body = "<oembed><title> A </title><html> <![CDATA[<b>x</b>]]> </html></oembed>";
        let data = XmlFormatter.format(body).unwrap();
        assert_eq!(data["title"], json!(" A "));
        assert_eq!(data["html"], json!(" <b>x</b> "));
    }

    #[test]
    fn ignores_documents_without_oembed_root() {
        let data = XmlFormatter
            .format("<response><type>video</type><html>x</html></response>")
            .unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(XmlFormatter.format("<oembed><html>bar</oembed>").is_err());
    }
}
