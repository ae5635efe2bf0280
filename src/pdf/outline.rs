use anyhow::{Context, Result};
use lopdf::{Document, Object, ObjectId};
use std::collections::{HashMap, HashSet};

use super::decode_text_string;

/// A node of the bookmark tree.
///
/// A bookmark that has children shows up as a `Leaf` immediately followed by
/// a `Group` holding them. Bookmarks whose destination cannot be resolved
/// contribute no `Leaf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineItem {
    Leaf { title: String, target_page: usize },
    Group { children: Vec<OutlineItem> },
}

impl OutlineItem {
    pub fn leaf(title: impl Into<String>, target_page: usize) -> Self {
        OutlineItem::Leaf {
            title: title.into(),
            target_page,
        }
    }

    pub fn group(children: Vec<OutlineItem>) -> Self {
        OutlineItem::Group { children }
    }
}

/// A leaf of the outline with its nesting depth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineLeaf<'a> {
    pub title: &'a str,
    pub target_page: usize,
    pub level: usize,
}

/// Flatten the outline depth-first into its leaves, in document order
pub fn flatten_outline(items: &[OutlineItem]) -> Vec<OutlineLeaf<'_>> {
    let mut result = Vec::new();
    flatten_recursive(items, 0, &mut result);
    result
}

fn flatten_recursive<'a>(items: &'a [OutlineItem], level: usize, result: &mut Vec<OutlineLeaf<'a>>) {
    for item in items {
        match item {
            OutlineItem::Leaf { title, target_page } => result.push(OutlineLeaf {
                title,
                target_page: *target_page,
                level,
            }),
            OutlineItem::Group { children } => flatten_recursive(children, level + 1, result),
        }
    }
}

/// Read the bookmark tree of a document, with 0-based target pages
pub fn extract_outline(doc: &Document) -> Result<Vec<OutlineItem>> {
    let catalog = doc
        .catalog()
        .with_context(|| "Failed to get document catalog")?;

    let outlines_ref = match catalog.get(b"Outlines") {
        Ok(Object::Reference(r)) => *r,
        _ => return Ok(Vec::new()),
    };

    let outlines = match doc.get_dictionary(outlines_ref) {
        Ok(d) => d,
        _ => return Ok(Vec::new()),
    };

    let first_ref = match outlines.get(b"First") {
        Ok(Object::Reference(r)) => *r,
        _ => return Ok(Vec::new()),
    };

    let page_map = build_page_map(doc);
    let mut visited = HashSet::new();
    Ok(parse_outline_items(doc, first_ref, &page_map, &mut visited))
}

fn parse_outline_items(
    doc: &Document,
    first_id: ObjectId,
    page_map: &HashMap<ObjectId, usize>,
    visited: &mut HashSet<ObjectId>,
) -> Vec<OutlineItem> {
    let mut items = Vec::new();
    let mut current_id = Some(first_id);

    while let Some(id) = current_id {
        // Malformed files can link siblings into a cycle
        if !visited.insert(id) {
            break;
        }

        let dict = match doc.get_dictionary(id) {
            Ok(d) => d,
            Err(_) => break,
        };

        let title = match dict.get(b"Title") {
            Ok(Object::String(bytes, _)) => decode_text_string(bytes),
            _ => "Untitled".to_string(),
        };

        if let Some(target_page) = get_destination_page(doc, dict, page_map) {
            items.push(OutlineItem::leaf(title, target_page));
        }

        if let Ok(Object::Reference(child_ref)) = dict.get(b"First") {
            let children = parse_outline_items(doc, *child_ref, page_map, visited);
            if !children.is_empty() {
                items.push(OutlineItem::group(children));
            }
        }

        current_id = match dict.get(b"Next") {
            Ok(Object::Reference(r)) => Some(*r),
            _ => None,
        };
    }

    items
}

fn get_destination_page(
    doc: &Document,
    dict: &lopdf::Dictionary,
    page_map: &HashMap<ObjectId, usize>,
) -> Option<usize> {
    if let Ok(dest) = dict.get(b"Dest") {
        return resolve_destination(doc, dest, page_map, 0);
    }

    let action = match dict.get(b"A") {
        Ok(Object::Reference(action_ref)) => doc.get_dictionary(*action_ref).ok()?,
        Ok(Object::Dictionary(action_dict)) => action_dict,
        _ => return None,
    };

    match action.get(b"S") {
        Ok(Object::Name(action_type)) if action_type == b"GoTo" => {
            let dest = action.get(b"D").ok()?;
            resolve_destination(doc, dest, page_map, 0)
        }
        _ => None,
    }
}

// Named destinations may point at other named destinations
const MAX_DEST_DEPTH: usize = 16;

fn resolve_destination(
    doc: &Document,
    dest: &Object,
    page_map: &HashMap<ObjectId, usize>,
    depth: usize,
) -> Option<usize> {
    if depth > MAX_DEST_DEPTH {
        return None;
    }

    match dest {
        Object::String(name, _) | Object::Name(name) => {
            resolve_named_destination(doc, name, page_map, depth + 1)
        }
        Object::Array(arr) => match arr.first() {
            Some(Object::Reference(page_ref)) => page_map.get(page_ref).copied(),
            _ => None,
        },
        Object::Reference(r) => {
            let obj = doc.get_object(*r).ok()?;
            resolve_destination(doc, obj, page_map, depth + 1)
        }
        // Destination dictionaries wrap the array in /D
        Object::Dictionary(d) => {
            let inner = d.get(b"D").ok()?;
            resolve_destination(doc, inner, page_map, depth + 1)
        }
        _ => None,
    }
}

fn resolve_named_destination(
    doc: &Document,
    name: &[u8],
    page_map: &HashMap<ObjectId, usize>,
    depth: usize,
) -> Option<usize> {
    let catalog = doc.catalog().ok()?;

    if let Ok(Object::Reference(names_ref)) = catalog.get(b"Names") {
        if let Ok(names_dict) = doc.get_dictionary(*names_ref) {
            if let Ok(Object::Reference(dests_ref)) = names_dict.get(b"Dests") {
                let mut visited = HashSet::new();
                if let Some(dest) = search_name_tree(doc, *dests_ref, name, &mut visited) {
                    return resolve_destination(doc, dest, page_map, depth);
                }
            }
        }
    }

    // Older files keep a plain /Dests dictionary in the catalog
    if let Ok(Object::Reference(dests_ref)) = catalog.get(b"Dests") {
        if let Ok(dests_dict) = doc.get_dictionary(*dests_ref) {
            if let Ok(dest) = dests_dict.get(name) {
                return resolve_destination(doc, dest, page_map, depth);
            }
        }
    }

    None
}

fn search_name_tree<'a>(
    doc: &'a Document,
    node_id: ObjectId,
    name: &[u8],
    visited: &mut HashSet<ObjectId>,
) -> Option<&'a Object> {
    if !visited.insert(node_id) {
        return None;
    }
    let dict = doc.get_dictionary(node_id).ok()?;

    if let Ok(Object::Array(names)) = dict.get(b"Names") {
        for chunk in names.chunks(2) {
            if let [Object::String(key, _), value] = chunk {
                if key.as_slice() == name {
                    return Some(value);
                }
            }
        }
    }

    if let Ok(Object::Array(kids)) = dict.get(b"Kids") {
        for kid in kids {
            if let Object::Reference(kid_ref) = kid {
                if let Some(found) = search_name_tree(doc, *kid_ref, name, visited) {
                    return Some(found);
                }
            }
        }
    }

    None
}

/// Page object id to 0-based page index
fn build_page_map(doc: &Document) -> HashMap<ObjectId, usize> {
    doc.get_pages()
        .into_iter()
        .map(|(num, id)| (id, num as usize - 1))
        .collect()
}
