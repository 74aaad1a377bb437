//! Edit plan markup
//!
//! The planner answers with a `<plan>` document holding three lists:
//!
//! ```xml
//! <plan>
//!   <add><item type="platform" pos="64,128" size="96,32" color="green"/></add>
//!   <modify><item id="3" property="texturePath" value="Assets/Generated/a.png"/></modify>
//!   <remove><item id="7"/></remove>
//! </plan>
//! ```
//!
//! The older Spanish vocabulary (`agregar`, `modificar`, `eliminar`, `tipo`,
//! `tam`, `propiedad`, `valor`) is accepted as well.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use super::error::PipelineError;
use super::ops::Vec2;

/// An entity the plan wants created
#[derive(Debug, Clone, PartialEq)]
pub struct AddItem {
    pub kind: String,
    pub position: Vec2,
    pub size: Vec2,
    pub color: Option<String>,
    pub texture_path: Option<String>,
}

/// A property change on an existing entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyItem {
    pub target_id: String,
    pub property: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveItem {
    pub target_id: String,
}

/// Parsed `<plan>` document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditPlan {
    pub add: Vec<AddItem>,
    pub modify: Vec<ModifyItem>,
    pub remove: Vec<RemoveItem>,
    /// The markup the plan was parsed from, handed to the synthesizer verbatim
    pub markup: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Add,
    Modify,
    Remove,
}

impl Section {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "add" | "agregar" => Some(Section::Add),
            "modify" | "modificar" => Some(Section::Modify),
            "remove" | "eliminar" => Some(Section::Remove),
            _ => None,
        }
    }
}

fn malformed(msg: impl Into<String>) -> PipelineError {
    PipelineError::PlanMalformed(msg.into())
}

impl EditPlan {
    /// True when all three lists are empty
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.modify.is_empty() && self.remove.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.add.len() + self.modify.len() + self.remove.len()
    }

    /// Parse plan markup
    ///
    /// The root must be `<plan>` and every element must be closed. A missing
    /// list is an empty list; unknown elements are ignored.
    pub fn parse(markup: &str) -> Result<Self, PipelineError> {
        debug!(markup_len = markup.len(), "EditPlan::parse: called");
        let mut reader = Reader::from_str(markup);
        reader.trim_text(true);

        let mut plan = EditPlan {
            markup: markup.to_string(),
            ..Self::default()
        };
        let mut stack: Vec<String> = Vec::new();
        let mut section: Option<Section> = None;
        let mut seen_root = false;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| malformed(format!("at byte {}: {}", reader.buffer_position(), e)))?;

            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    let tag = tag_name(e)?;

                    match stack.len() {
                        0 => {
                            if seen_root {
                                return Err(malformed("more than one root element"));
                            }
                            if !tag.eq_ignore_ascii_case("plan") {
                                return Err(malformed(format!("root element is <{}>, expected <plan>", tag)));
                            }
                            seen_root = true;
                        }
                        1 => {
                            section = Section::from_tag(&tag);
                            if section.is_none() {
                                debug!(%tag, "EditPlan::parse: ignoring unknown section");
                            }
                        }
                        2 => {
                            if let Some(section) = section {
                                plan.push_item(section, e)?;
                            }
                        }
                        _ => {}
                    }

                    if !is_empty {
                        stack.push(tag);
                    } else if stack.len() == 1 {
                        section = None;
                    }
                }
                Event::End(_) => {
                    stack.pop().ok_or_else(|| malformed("unexpected closing tag"))?;
                    if stack.len() <= 1 {
                        section = None;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !seen_root {
            return Err(malformed("no <plan> element"));
        }
        if let Some(open) = stack.last() {
            return Err(malformed(format!("unclosed element <{}>", open)));
        }

        debug!(
            add = plan.add.len(),
            modify = plan.modify.len(),
            remove = plan.remove.len(),
            "EditPlan::parse: parsed"
        );
        Ok(plan)
    }

    fn push_item(&mut self, section: Section, element: &BytesStart<'_>) -> Result<(), PipelineError> {
        let attrs = Attributes::read(element)?;
        match section {
            Section::Add => {
                let kind = attrs.require(&["type", "tipo", "kind"])?;
                let position = parse_vec2(&attrs.require(&["pos", "position"])?)?;
                let size = parse_vec2(&attrs.require(&["size", "tam"])?)?;
                self.add.push(AddItem {
                    kind,
                    position,
                    size,
                    color: attrs.get(&["color"]),
                    texture_path: attrs.get(&["texturePath", "texture"]),
                });
            }
            Section::Modify => self.modify.push(ModifyItem {
                target_id: attrs.require(&["id", "targetId"])?,
                property: attrs.require(&["property", "propiedad"])?,
                value: attrs.require(&["value", "valor"])?,
            }),
            Section::Remove => self.remove.push(RemoveItem {
                target_id: attrs.require(&["id", "targetId"])?,
            }),
        }
        Ok(())
    }
}

fn tag_name(element: &BytesStart<'_>) -> Result<String, PipelineError> {
    std::str::from_utf8(element.name().as_ref())
        .map(str::to_string)
        .map_err(|e| malformed(format!("invalid tag name: {}", e)))
}

/// Unescaped attributes of one item element
struct Attributes(Vec<(String, String)>);

impl Attributes {
    fn read(element: &BytesStart<'_>) -> Result<Self, PipelineError> {
        let mut pairs = Vec::new();
        for attr in element.attributes() {
            let attr = attr.map_err(|e| malformed(format!("bad attribute: {}", e)))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| malformed(format!("bad attribute name: {}", e)))?
                .to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| malformed(format!("bad value for '{}': {}", key, e)))?
                .trim()
                .to_string();
            pairs.push((key, value));
        }
        Ok(Self(pairs))
    }

    /// First non-empty value among the given names (case-insensitive)
    fn get(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| {
            self.0
                .iter()
                .find(|(key, value)| key.eq_ignore_ascii_case(name) && !value.is_empty())
                .map(|(_, value)| value.clone())
        })
    }

    fn require(&self, names: &[&str]) -> Result<String, PipelineError> {
        self.get(names)
            .ok_or_else(|| malformed(format!("item is missing '{}'", names[0])))
    }
}

/// Parse `"x,y"` (whitespace around or instead of the comma is tolerated)
pub fn parse_vec2(text: &str) -> Result<Vec2, PipelineError> {
    let parts: Vec<&str> = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();

    match parts.as_slice() {
        [x, y] => {
            let x: f64 = x.parse().map_err(|_| malformed(format!("bad vector '{}'", text)))?;
            let y: f64 = y.parse().map_err(|_| malformed(format!("bad vector '{}'", text)))?;
            if x.is_finite() && y.is_finite() {
                Ok([x, y])
            } else {
                Err(malformed(format!("bad vector '{}'", text)))
            }
        }
        _ => Err(malformed(format!("bad vector '{}'", text))),
    }
}
