//! RSS 2.0 document decoding.
//!
//! Only the `channel` element and its `item` children are read:
//!
//! ```text
//! rss/channel/{title, link, description}
//! rss/channel/item/{title, link, description, pubDate}
//! ```
//!
//! Elements are matched by their qualified name, so namespaced extensions
//! such as `atom:link` or `dc:creator` never collide with the RSS fields.
//! Unknown elements and attributes are ignored, and text inside inline
//! markup that a feed forgot to escape is kept. After XML decoding every
//! text field goes through HTML entity decoding once more, because feeds
//! routinely double-encode (`&amp;amp;`).

use crate::error::FeedError;
use crate::models::{RawFeed, RawItem};
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
enum Field {
    ChannelTitle,
    ChannelLink,
    ChannelDescription,
    ItemTitle,
    ItemLink,
    ItemDescription,
    ItemPubDate,
}

impl Field {
    /// The field whose text is being read at `path` (root first), along with
    /// the depth of the field element itself.
    fn at(path: &[String]) -> Option<(Field, usize)> {
        if path.get(1).map(String::as_str) != Some("channel") {
            return None;
        }
        match path.get(2).map(String::as_str)? {
            "title" => Some((Field::ChannelTitle, 3)),
            "link" => Some((Field::ChannelLink, 3)),
            "description" => Some((Field::ChannelDescription, 3)),
            "item" => {
                let field = match path.get(3).map(String::as_str)? {
                    "title" => Field::ItemTitle,
                    "link" => Field::ItemLink,
                    "description" => Field::ItemDescription,
                    "pubDate" => Field::ItemPubDate,
                    _ => return None,
                };
                Some((field, 4))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct ItemText {
    title: String,
    link: String,
    description: String,
    pub_date: String,
}

#[derive(Debug, Default)]
struct ChannelText {
    title: String,
    link: String,
    description: String,
    items: Vec<ItemText>,
}

impl ChannelText {
    fn slot(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::ChannelTitle => Some(&mut self.title),
            Field::ChannelLink => Some(&mut self.link),
            Field::ChannelDescription => Some(&mut self.description),
            Field::ItemTitle => self.items.last_mut().map(|i| &mut i.title),
            Field::ItemLink => self.items.last_mut().map(|i| &mut i.link),
            Field::ItemDescription => self.items.last_mut().map(|i| &mut i.description),
            Field::ItemPubDate => self.items.last_mut().map(|i| &mut i.pub_date),
        }
    }

    fn push_text(&mut self, path: &[String], text: &str) {
        if let Some((field, _)) = Field::at(path) {
            if let Some(slot) = self.slot(field) {
                slot.push_str(text);
            }
        }
    }
}

/// Decode an RSS document body into a [`RawFeed`].
///
/// # Errors
///
/// Returns [`FeedError::Parse`] when the body is not well-formed XML or its
/// root has no `channel` element.
pub fn parse_document(body: &str) -> Result<RawFeed, FeedError> {
    // Text is not trimmed while reading: entity references arrive as their
    // own events and the spaces around them matter.
    let mut reader = Reader::from_str(body);
    let mut path: Vec<String> = Vec::new();
    let mut channel = ChannelText::default();
    let mut saw_channel = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if path.len() == 1 && name == "channel" {
                    saw_channel = true;
                }
                if path.len() == 2 && path[1] == "channel" && name == "item" {
                    channel.items.push(ItemText::default());
                }
                path.push(name);

                // A repeated field element replaces the earlier value.
                if let Some((field, depth)) = Field::at(&path) {
                    if depth == path.len() {
                        if let Some(slot) = channel.slot(field) {
                            slot.clear();
                        }
                    }
                }
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(e)) => channel.push_text(&path, &String::from_utf8_lossy(&e)),
            Ok(Event::CData(e)) => channel.push_text(&path, &String::from_utf8_lossy(&e)),
            Ok(Event::GeneralRef(e)) => {
                let name = String::from_utf8_lossy(&e);
                channel.push_text(&path, &resolve_reference(&name));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FeedError::Parse(e.to_string())),
            _ => {}
        }
    }

    if let Some(open) = path.last() {
        return Err(FeedError::Parse(format!("document ended inside <{open}>")));
    }
    if !saw_channel {
        return Err(FeedError::Parse("no channel element".to_string()));
    }

    let items = channel
        .items
        .into_iter()
        .map(|item| {
            let description = decode_entities(&item.description);
            RawItem {
                title: decode_entities(&item.title),
                link: decode_entities(&item.link),
                description: (!description.is_empty()).then_some(description),
                pub_date: decode_entities(&item.pub_date),
            }
        })
        .collect::<Vec<_>>();

    debug!(count = items.len(), "Decoded RSS items");
    Ok(RawFeed {
        title: decode_entities(&channel.title),
        link: decode_entities(&channel.link),
        description: decode_entities(&channel.description),
        items,
    })
}

/// Resolve an XML reference. Character references and the predefined
/// entities are replaced; anything else is kept as written for the HTML pass.
fn resolve_reference(name: &str) -> String {
    if let Some(code) = name.strip_prefix('#') {
        let value = match code.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse().ok(),
        };
        if let Some(c) = value.and_then(char::from_u32) {
            return c.to_string();
        }
    } else if let Some(text) = resolve_predefined_entity(name) {
        return text.to_string();
    }
    format!("&{name};")
}

/// Decode HTML entities one at a time. A bare `&` or an unknown entity is
/// kept as-is without affecting the rest of the text.
fn decode_entities(text: &str) -> String {
    let mut decoded = String::with_capacity(text.len());
    let mut rest = text.trim();

    while let Some(start) = rest.find('&') {
        decoded.push_str(&rest[..start]);
        let candidate = &rest[start..];
        let entity = entity_span(candidate)
            .and_then(|span| Some((span.len(), htmlescape::decode_html(span).ok()?)));
        match entity {
            Some((len, text)) => {
                decoded.push_str(&text);
                rest = &candidate[len..];
            }
            None => {
                decoded.push('&');
                rest = &candidate[1..];
            }
        }
    }
    decoded.push_str(rest);
    decoded
}

/// The `&...;` span at the start of `text`, if it is shaped like an entity.
fn entity_span(text: &str) -> Option<&str> {
    let end = 1 + text[1..].find(|c: char| c == ';' || c == '&' || c.is_whitespace())?;
    (end > 1 && text[end..].starts_with(';')).then(|| &text[..=end])
}
