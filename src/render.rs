//! Page body rendering.
//!
//! The export core only needs a byte stream to materialize; producing it is
//! a collaborator's job behind the [`Renderer`] trait. The default
//! [`HtmlRenderer`] wraps a page's body markup in a minimal HTML shell that
//! the remote store converts into a native document on upload.
//!
//! Intra-wiki hyperlinks inside page bodies are uploaded as-is. Rewriting
//! them to point at exported documents is a separate pass that would run
//! after export, not inside it.

use anyhow::Result;

use crate::models::PageNode;

/// Produces the document body bytes for a page dump.
pub trait Renderer: Send + Sync {
    fn render(&self, page: &PageNode) -> Result<Vec<u8>>;
}

/// Default renderer: the page body wrapped in an HTML document titled
/// after the dump file (`_` + page name).
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn render(&self, page: &PageNode) -> Result<Vec<u8>> {
        let html = format!(
            "<!DOCTYPE html>\n\
             <html>\n\
             <head>\n\
               <meta charset=\"UTF-8\">\n\
               <title>_{}</title>\n\
             </head>\n\
             <body>\n\
             {}\n\
             </body>\n\
             </html>\n",
            page.name, page.body
        );
        Ok(html.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PageKind;

    fn page(name: &str, body: &str) -> PageNode {
        PageNode {
            name: name.to_string(),
            kind: PageKind::Standard,
            body: body.to_string(),
            attachments: vec![],
            children: vec![],
        }
    }

    #[test]
    fn wraps_body_in_html_shell() {
        let out = HtmlRenderer.render(&page("Home", "<p>Welcome</p>")).unwrap();
        let html = String::from_utf8(out).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>_Home</title>"));
        assert!(html.contains("<p>Welcome</p>"));
    }

    #[test]
    fn empty_body_still_renders() {
        let out = HtmlRenderer.render(&page("Blank", "")).unwrap();
        let html = String::from_utf8(out).unwrap();
        assert!(html.contains("<title>_Blank</title>"));
        assert!(html.contains("<body>"));
    }
}
