//! Feed parser.
//!
//! Extracts items from RSS 2.0 and Atom documents. Real-world feeds are
//! frequently not well-formed, so the parser works on the quick-xml event
//! stream with end-name checks disabled and slices the raw inner markup of
//! each element from the source. A field that cannot be found degrades to an
//! empty string or None; it never fails the whole item.
//!
//! Field resolution per element is: CDATA content, then plain content, then
//! an `href` / `url` attribute. Entities are decoded once, after extraction.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use super::date::parse_feed_date;
use super::html::{decode_entities, unwrap_cdata};
use super::types::FeedItem;

/// Item container of a feed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    /// RSS 0.9x / 1.0 / 2.0 `<item>`.
    Rss,
    /// Atom `<entry>`.
    Atom,
}

impl FeedFormat {
    /// Detect the item container from the raw text.
    ///
    /// `<item` wins over `<entry`; None when neither tag occurs.
    pub fn detect(text: &str) -> Option<Self> {
        if contains_open_tag(text, "item") {
            Some(FeedFormat::Rss)
        } else if contains_open_tag(text, "entry") {
            Some(FeedFormat::Atom)
        } else {
            None
        }
    }

    fn container(&self) -> &'static str {
        match self {
            FeedFormat::Rss => "item",
            FeedFormat::Atom => "entry",
        }
    }
}

fn contains_open_tag(text: &str, name: &str) -> bool {
    let needle = format!("<{name}");
    let mut rest = text;
    while let Some(pos) = rest.find(&needle) {
        let after = &rest[pos + needle.len()..];
        match after.chars().next() {
            Some(c) if c == '>' || c == '/' || c.is_whitespace() => return true,
            _ => rest = after,
        }
    }
    false
}

/// Parse a feed document into a lazy sequence of items.
///
/// The sequence is empty when the document has no recognisable item
/// container; callers treat that as "no items found".
pub fn parse_items(text: &str) -> FeedItems<'_> {
    FeedItems::new(text)
}

/// Lazy, non-restartable iterator over the items of one feed document.
pub struct FeedItems<'a> {
    source: &'a str,
    reader: Reader<&'a [u8]>,
    format: Option<FeedFormat>,
    done: bool,
}

impl<'a> FeedItems<'a> {
    /// Create an iterator over `source`.
    pub fn new(source: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().check_end_names = false;

        let format = FeedFormat::detect(source);
        Self {
            source,
            reader,
            format,
            done: format.is_none(),
        }
    }

    /// Detected document format.
    pub fn format(&self) -> Option<FeedFormat> {
        self.format
    }

    fn byte_offset(&self) -> usize {
        self.reader.buffer_position() as usize
    }

    /// Byte offset where the end tag just read starts.
    fn end_tag_start(&self) -> usize {
        let pos = self.byte_offset();
        self.source
            .get(..pos)
            .and_then(|s| s.rfind("</"))
            .unwrap_or(pos)
    }

    /// Byte offset where the tag just read starts.
    fn tag_start(&self) -> usize {
        let pos = self.byte_offset();
        self.source
            .get(..pos)
            .and_then(|s| s.rfind('<'))
            .unwrap_or(pos)
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.source
            .get(start..end.max(start))
            .unwrap_or_default()
            .to_string()
    }

    /// Read the body of one container element into nodes.
    ///
    /// Stops at the container's end tag, at end of input, or at the first
    /// reader error. Whatever was collected is returned in every case.
    fn collect_item(&mut self, container: &str) -> Vec<Node> {
        let mut nodes: Vec<Node> = Vec::new();
        let mut open: Vec<OpenNode> = Vec::new();

        loop {
            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    self.note_child(&mut open);
                    let index = nodes.len();
                    nodes.push(Node::from_start(&e, open.len() + 1));
                    open.push(OpenNode {
                        name: nodes[index].name.clone(),
                        inner_start: self.byte_offset(),
                        first_child_start: None,
                        index,
                    });
                }
                Ok(Event::Empty(e)) => {
                    self.note_child(&mut open);
                    nodes.push(Node::from_start(&e, open.len() + 1));
                }
                Ok(Event::End(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let end = self.end_tag_start();

                    let Some(matched) = open
                        .iter()
                        .rposition(|o| o.name.eq_ignore_ascii_case(&name))
                    else {
                        if name.eq_ignore_ascii_case(container) {
                            self.close_all(&mut nodes, &mut open, end);
                            return nodes;
                        }
                        // Stray end tag
                        continue;
                    };

                    while open.len() > matched + 1 {
                        if let Some(o) = open.pop() {
                            self.close_unterminated(&mut nodes, o, end);
                        }
                    }
                    if let Some(o) = open.pop() {
                        nodes[o.index].raw = self.slice(o.inner_start, end);
                    }
                }
                Ok(Event::Eof) => {
                    self.done = true;
                    let end = self.source.len();
                    self.close_all(&mut nodes, &mut open, end);
                    return nodes;
                }
                Err(e) => {
                    debug!("Feed reader stopped at byte {}: {}", self.byte_offset(), e);
                    self.done = true;
                    let end = self.byte_offset().min(self.source.len());
                    self.close_all(&mut nodes, &mut open, end);
                    return nodes;
                }
                Ok(_) => {}
            }
        }
    }

    /// Record where the innermost open element's first child begins.
    fn note_child(&self, open: &mut [OpenNode]) {
        let start = self.tag_start();
        if let Some(parent) = open.last_mut() {
            parent.first_child_start.get_or_insert(start);
        }
    }

    /// Close an element that never saw its end tag.
    ///
    /// Its content stops at its first child, and its children move up one
    /// level so they are still found as fields of the item.
    fn close_unterminated(&self, nodes: &mut [Node], o: OpenNode, end: usize) {
        let end = o.first_child_start.unwrap_or(end);
        nodes[o.index].raw = self.slice(o.inner_start, end);
        for node in nodes[o.index + 1..].iter_mut() {
            node.depth = node.depth.saturating_sub(1);
        }
    }

    fn close_all(&self, nodes: &mut [Node], open: &mut Vec<OpenNode>, end: usize) {
        while let Some(o) = open.pop() {
            self.close_unterminated(nodes, o, end);
        }
    }
}

impl Iterator for FeedItems<'_> {
    type Item = FeedItem;

    fn next(&mut self) -> Option<FeedItem> {
        if self.done {
            return None;
        }
        let container = self.format?.container();

        loop {
            match self.reader.read_event() {
                Ok(Event::Start(e)) if is_named(&e, container) => {
                    let nodes = self.collect_item(container);
                    return Some(build_item(&nodes));
                }
                Ok(Event::Empty(e)) if is_named(&e, container) => {
                    return Some(FeedItem::default());
                }
                Ok(Event::Eof) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    debug!("Feed reader stopped at byte {}: {}", self.byte_offset(), e);
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
            }
        }
    }
}

fn is_named(e: &BytesStart<'_>, name: &str) -> bool {
    e.name().as_ref().eq_ignore_ascii_case(name.as_bytes())
}

struct OpenNode {
    name: String,
    inner_start: usize,
    first_child_start: Option<usize>,
    index: usize,
}

/// One element inside an item.
#[derive(Debug)]
struct Node {
    name: String,
    attrs: Vec<(String, String)>,
    /// Raw inner markup, undecoded.
    raw: String,
    /// 1 for direct children of the item.
    depth: usize,
}

impl Node {
    fn from_start(e: &BytesStart<'_>, depth: usize) -> Self {
        let attrs = e
            .html_attributes()
            .with_checks(false)
            .map_while(|a| a.ok())
            .map(|a| {
                (
                    String::from_utf8_lossy(a.key.as_ref()).into_owned(),
                    String::from_utf8_lossy(&a.value).into_owned(),
                )
            })
            .collect();

        Self {
            name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            attrs,
            raw: String::new(),
            depth,
        }
    }

    fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    fn attr(&self, key: &str) -> Option<String> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| decode_entities(v.trim()))
            .filter(|v| !v.is_empty())
    }

    /// CDATA, then plain content; entities decoded once.
    fn text(&self) -> Option<String> {
        let content = unwrap_cdata(&self.raw).unwrap_or_else(|| self.raw.clone());
        let content = content.trim();
        if content.is_empty() {
            None
        } else {
            Some(decode_entities(content))
        }
    }

    /// Text, falling back to an `href` or `url` attribute.
    fn text_or_link_attr(&self) -> Option<String> {
        self.text()
            .or_else(|| self.attr("href"))
            .or_else(|| self.attr("url"))
    }
}

/// First non-empty text among direct children named `names`, in order.
fn child_text(nodes: &[Node], names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        nodes
            .iter()
            .filter(|n| n.depth == 1 && n.is(name))
            .find_map(Node::text)
    })
}

/// First `url` attribute on any element named `name`, at any depth.
fn any_url(nodes: &[Node], name: &str) -> Option<String> {
    nodes
        .iter()
        .filter(|n| n.is(name))
        .find_map(|n| n.attr("url"))
}

fn resolve_link(nodes: &[Node]) -> String {
    let links: Vec<&Node> = nodes
        .iter()
        .filter(|n| n.depth == 1 && n.is("link"))
        .collect();

    // RSS plain-text link
    if let Some(text) = links.iter().find_map(|n| n.text()) {
        return text;
    }

    // Atom: the alternate link, then any link
    links
        .iter()
        .filter(|n| {
            n.attr("rel")
                .map_or(true, |rel| rel.eq_ignore_ascii_case("alternate"))
        })
        .find_map(|n| n.text_or_link_attr())
        .or_else(|| links.iter().find_map(|n| n.text_or_link_attr()))
        .unwrap_or_default()
}

fn build_item(nodes: &[Node]) -> FeedItem {
    let title = child_text(nodes, &["title"]).unwrap_or_default();
    let link = resolve_link(nodes);
    let guid = child_text(nodes, &["guid", "id"]).unwrap_or_default();

    let summary = child_text(nodes, &["description", "summary"])
        .or_else(|| {
            // Video feeds keep the description in a media group
            nodes
                .iter()
                .filter(|n| n.is("media:description"))
                .find_map(Node::text)
        })
        .unwrap_or_default();

    let body_html =
        child_text(nodes, &["content:encoded", "content"]).unwrap_or_else(|| summary.clone());

    let media_url = any_url(nodes, "media:content")
        .or_else(|| any_url(nodes, "enclosure"))
        .or_else(|| any_url(nodes, "media:thumbnail"));

    let published_at = ["pubDate", "published", "updated", "dc:date"]
        .iter()
        .filter_map(|name| child_text(nodes, &[name]))
        .find_map(|raw| parse_feed_date(&raw));

    FeedItem {
        title,
        link,
        guid,
        published_at,
        summary,
        body_html,
        media_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/"
     xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Example Blog</title>
    <link>https://example.com</link>
    <item>
      <title>A&amp;B</title>
      <link>https://example.com/a</link>
      <guid isPermaLink="false">post-a</guid>
      <pubDate>Mon, 15 Jan 2024 10:00:00 +0000</pubDate>
      <description><![CDATA[<p>Short &amp; sweet</p>]]></description>
      <content:encoded><![CDATA[<p>Full body</p><img src="https://example.com/a.jpg">]]></content:encoded>
      <enclosure url="https://example.com/a.mp3" type="audio/mpeg" length="1"/>
    </item>
    <item>
      <title>Second</title>
      <link>https://example.com/b</link>
      <description>&lt;p&gt;Escaped markup&lt;/p&gt;</description>
      <media:content url="https://example.com/b.jpg" medium="image"/>
      <enclosure url="https://example.com/b.mp3"/>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Atom</title>
  <link href="https://example.com/"/>
  <entry>
    <title type="html">Atom &lt;Entry&gt;</title>
    <link rel="self" href="https://example.com/entry/1.atom"/>
    <link rel="alternate" type="text/html" href="https://example.com/entry/1"/>
    <id>urn:uuid:1225c695</id>
    <published>2024-01-15T10:00:00Z</published>
    <updated>2024-02-01T00:00:00Z</updated>
    <summary>Summary text</summary>
    <content type="html">&lt;p&gt;Content&lt;/p&gt;</content>
  </entry>
</feed>"#;

    #[test]
    fn test_detect_format() {
        assert_eq!(FeedFormat::detect(RSS), Some(FeedFormat::Rss));
        assert_eq!(FeedFormat::detect(ATOM), Some(FeedFormat::Atom));
        assert_eq!(FeedFormat::detect("<rss><channel/></rss>"), None);
        assert_eq!(FeedFormat::detect("<items><itemize/></items>"), None);
        assert_eq!(FeedFormat::detect("<item/>"), Some(FeedFormat::Rss));
    }

    #[test]
    fn test_parse_rss_items() {
        let items: Vec<FeedItem> = parse_items(RSS).collect();
        assert_eq!(items.len(), 2);

        let a = &items[0];
        assert_eq!(a.title, "A&B");
        assert_eq!(a.link, "https://example.com/a");
        assert_eq!(a.guid, "post-a");
        assert_eq!(a.external_id(), "post-a");
        assert_eq!(
            a.published_at.map(|d| d.to_rfc3339()),
            Some("2024-01-15T10:00:00+00:00".to_string())
        );
        assert_eq!(a.summary, "<p>Short & sweet</p>");
        assert!(a.body_html.starts_with("<p>Full body</p>"));
        assert_eq!(a.media_url.as_deref(), Some("https://example.com/a.mp3"));

        let b = &items[1];
        assert_eq!(b.guid, "");
        assert_eq!(b.external_id(), "https://example.com/b");
        assert_eq!(b.summary, "<p>Escaped markup</p>");
        assert_eq!(b.body_html, b.summary);
        // media:content wins over enclosure
        assert_eq!(b.media_url.as_deref(), Some("https://example.com/b.jpg"));
        assert!(b.published_at.is_none());
    }

    #[test]
    fn test_parse_atom_entry() {
        let items: Vec<FeedItem> = parse_items(ATOM).collect();
        assert_eq!(items.len(), 1);

        let entry = &items[0];
        assert_eq!(entry.title, "Atom <Entry>");
        assert_eq!(entry.link, "https://example.com/entry/1");
        assert_eq!(entry.guid, "urn:uuid:1225c695");
        assert_eq!(entry.summary, "Summary text");
        assert_eq!(entry.body_html, "<p>Content</p>");
        assert_eq!(
            entry.published_at.map(|d| d.to_rfc3339()),
            Some("2024-01-15T10:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_parse_youtube_entry() {
        let doc = r#"<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015"
              xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom">
 <entry>
  <id>yt:video:abc123</id>
  <title>Video</title>
  <link rel="alternate" href="https://www.youtube.com/watch?v=abc123"/>
  <published>2024-01-15T10:00:00+00:00</published>
  <media:group>
   <media:title>Video</media:title>
   <media:thumbnail url="https://i.ytimg.com/vi/abc123/hqdefault.jpg" width="480" height="360"/>
   <media:description>About the video</media:description>
  </media:group>
 </entry>
</feed>"#;
        let items: Vec<FeedItem> = parse_items(doc).collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].guid, "yt:video:abc123");
        assert_eq!(items[0].title, "Video");
        assert_eq!(items[0].summary, "About the video");
        assert_eq!(
            items[0].media_url.as_deref(),
            Some("https://i.ytimg.com/vi/abc123/hqdefault.jpg")
        );
    }

    #[test]
    fn test_item_without_id_is_yielded() {
        let doc = "<rss><channel>\
            <item><guid>A</guid><title>Hello</title></item>\
            <item><title>No id</title></item>\
            </channel></rss>";
        let items: Vec<FeedItem> = parse_items(doc).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].external_id(), "A");
        assert_eq!(items[1].title, "No id");
        assert_eq!(items[1].external_id(), "");
    }

    #[test]
    fn test_nested_titles_are_ignored() {
        let doc = "<feed><entry><source><title>Other feed</title></source>\
            <id>x</id></entry></feed>";
        let items: Vec<FeedItem> = parse_items(doc).collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "");
        assert_eq!(items[0].guid, "x");
    }

    #[test]
    fn test_unclosed_field_degrades() {
        let doc = "<rss><channel>\
            <item><title>Broken<guid>g1</guid></item>\
            <item><title>Fine</title><guid>g2</guid></item>\
            </channel></rss>";
        let items: Vec<FeedItem> = parse_items(doc).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].guid, "g1");
        assert_eq!(items[0].title, "Broken");
        assert_eq!(items[1].title, "Fine");
        assert_eq!(items[1].guid, "g2");
    }

    #[test]
    fn test_truncated_document_yields_partial_item() {
        let doc = "<rss><channel><item><guid>g1</guid><title>Cut";
        let items: Vec<FeedItem> = parse_items(doc).collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].guid, "g1");
        assert_eq!(items[0].title, "Cut");
    }

    #[test]
    fn test_no_container_yields_nothing() {
        assert_eq!(parse_items("<rss><channel></channel></rss>").count(), 0);
        assert_eq!(parse_items("").count(), 0);
        assert_eq!(parse_items("not xml at all").count(), 0);
    }

    #[test]
    fn test_items_are_lazy() {
        let mut items = parse_items(RSS);
        assert_eq!(items.format(), Some(FeedFormat::Rss));
        assert_eq!(items.next().map(|i| i.guid), Some("post-a".to_string()));
        assert!(items.next().is_some());
        assert!(items.next().is_none());
        assert!(items.next().is_none());
    }

    #[test]
    fn test_entities_decoded_once() {
        let doc = "<rss><item><guid>1</guid><title>Rock &amp;amp; Roll</title></item></rss>";
        let item = parse_items(doc).next().unwrap();
        assert_eq!(item.title, "Rock &amp; Roll");

        let doc = "<rss><item><guid>1</guid><title><![CDATA[Q&amp;A]]></title></item></rss>";
        let item = parse_items(doc).next().unwrap();
        assert_eq!(item.title, "Q&A");
    }

    #[test]
    fn test_link_attribute_fallback() {
        let doc = r#"<feed><entry><id>e</id><link href="https://example.com/e?a=1&amp;b=2"/></entry></feed>"#;
        let item = parse_items(doc).next().unwrap();
        assert_eq!(item.link, "https://example.com/e?a=1&b=2");
    }

    #[test]
    fn test_inline_markup_is_sliced_verbatim() {
        let doc = "<rss><item><guid>1</guid>\
            <description><p>Hi <b>there</b></p></description>\
            <title>After</title></item></rss>";
        let item = parse_items(doc).next().unwrap();
        assert_eq!(item.summary, "<p>Hi <b>there</b></p>");
        assert_eq!(item.title, "After");
    }
}
