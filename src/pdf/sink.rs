use anyhow::{bail, Context, Result};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

const MAX_TREE_DEPTH: usize = 64;

/// Collects pages from one or more documents, in order, into a new document.
///
/// Every appended page becomes its own page object, so the same source page
/// may be appended any number of times. References into the source page
/// trees are repointed at the copies or cut, so pages that were not asked
/// for never end up in the output.
pub struct PageSink {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    /// Source page id to its first copy
    page_copies: HashMap<ObjectId, ObjectId>,
    /// Page and page tree nodes of every appended source
    retired: HashSet<ObjectId>,
}

impl Default for PageSink {
    fn default() -> Self {
        Self::new()
    }
}

impl PageSink {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        PageSink {
            doc,
            pages_id,
            kids: Vec::new(),
            page_copies: HashMap::new(),
            retired: HashSet::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append the given 0-based pages of `source`, in the order given
    pub fn append(&mut self, source: &Document, indices: &[usize]) -> Result<()> {
        let mut source = source.clone();
        source.renumber_objects_with(self.doc.max_id + 1);

        let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();
        if let Some(&bad) = indices.iter().find(|&&i| i >= page_ids.len()) {
            bail!(
                "Page index {} is out of range for a document of {} page(s)",
                bad,
                page_ids.len()
            );
        }

        let mut pages = Vec::with_capacity(indices.len());
        for &index in indices {
            let mut page = detached_page(&source, page_ids[index])?;
            page.set("Parent", self.pages_id);
            pages.push((page_ids[index], page));
        }

        self.retired.extend(
            source
                .objects
                .iter()
                .filter(|(_, object)| is_page_tree_node(object))
                .map(|(&id, _)| id),
        );

        if source.version > self.doc.version {
            self.doc.version = source.version.clone();
        }
        self.doc.max_id = self.doc.max_id.max(source.max_id);
        self.doc.objects.extend(source.objects);

        for (source_id, page) in pages {
            let id = self.doc.add_object(page);
            self.page_copies.entry(source_id).or_insert(id);
            self.kids.push(id);
        }

        debug!(
            appended = indices.len(),
            total = self.kids.len(),
            "appended pages"
        );
        Ok(())
    }

    /// Build the page tree and catalog, dropping everything the new tree
    /// does not reach.
    pub fn finish(mut self) -> Document {
        let kids: Vec<Object> = self.kids.iter().map(|&id| Object::Reference(id)).collect();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.kids.len() as i64,
            }),
        );

        self.drop_dangling_links();
        self.repoint_page_references();

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });

        self.doc.trailer = Dictionary::new();
        self.doc.trailer.set("Root", catalog_id);

        self.doc.prune_objects();
        self.doc.renumber_objects();
        self.doc.compress();
        self.doc
    }

    /// Remove link annotations whose target page was not copied
    fn drop_dangling_links(&mut self) {
        for &page_id in &self.kids {
            let Ok(page) = self.doc.get_dictionary(page_id) else {
                continue;
            };
            let (array_id, annots) = match page.get(b"Annots") {
                Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                    Ok(Object::Array(items)) => (Some(*id), items.clone()),
                    _ => continue,
                },
                Ok(Object::Array(items)) => (None, items.clone()),
                _ => continue,
            };

            let kept: Vec<Object> = annots
                .iter()
                .filter(|annot| keeps_annotation(&self.doc, &self.page_copies, annot))
                .cloned()
                .collect();
            if kept.len() == annots.len() {
                continue;
            }

            debug!(
                dropped = annots.len() - kept.len(),
                "dropping links to pages that were not copied"
            );
            match array_id {
                Some(id) => {
                    self.doc.objects.insert(id, Object::Array(kept));
                }
                None => {
                    if let Ok(page) = self.doc.get_dictionary_mut(page_id) {
                        page.set("Annots", kept);
                    }
                }
            }
        }
    }

    /// Walk everything the new page tree reaches: references to copied
    /// source pages now point at the copy, other source page tree nodes
    /// become null.
    fn repoint_page_references(&mut self) {
        let mut pending = self.kids.clone();
        let mut visited = HashSet::new();

        while let Some(id) = pending.pop() {
            if !visited.insert(id) {
                continue;
            }
            if let Some(object) = self.doc.objects.get_mut(&id) {
                repoint(object, &self.page_copies, &self.retired, &mut pending);
            }
        }
    }
}

fn repoint(
    object: &mut Object,
    copies: &HashMap<ObjectId, ObjectId>,
    retired: &HashSet<ObjectId>,
    pending: &mut Vec<ObjectId>,
) {
    if let Object::Reference(id) = object {
        let id = copies.get(id).copied().unwrap_or(*id);
        *object = if retired.contains(&id) {
            Object::Null
        } else {
            pending.push(id);
            Object::Reference(id)
        };
        return;
    }

    match object {
        Object::Array(items) => {
            for item in items {
                repoint(item, copies, retired, pending);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                repoint(value, copies, retired, pending);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                repoint(value, copies, retired, pending);
            }
        }
        _ => {}
    }
}

fn is_page_tree_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => matches!(
            dict.get(b"Type"),
            Ok(Object::Name(name)) if name == b"Page" || name == b"Pages"
        ),
        _ => false,
    }
}

fn keeps_annotation(doc: &Document, copies: &HashMap<ObjectId, ObjectId>, annot: &Object) -> bool {
    let annot = match annot {
        Object::Reference(id) => match doc.get_dictionary(*id) {
            Ok(dict) => dict,
            Err(_) => return true,
        },
        Object::Dictionary(dict) => dict,
        _ => return true,
    };

    match link_target(doc, annot) {
        Some(target) => copies.contains_key(&target),
        None => true,
    }
}

/// Page object an annotation jumps to within its own document
fn link_target(doc: &Document, annot: &Dictionary) -> Option<ObjectId> {
    let dest = match annot.get(b"Dest") {
        Ok(dest) => dest,
        Err(_) => {
            let action = match annot.get(b"A").ok()? {
                Object::Reference(id) => doc.get_dictionary(*id).ok()?,
                Object::Dictionary(dict) => dict,
                _ => return None,
            };
            match action.get(b"S") {
                Ok(Object::Name(kind)) if kind == b"GoTo" => action.get(b"D").ok()?,
                _ => return None,
            }
        }
    };

    let dest = match dest {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    match dest {
        Object::Array(items) => items.first()?.as_reference().ok(),
        _ => None,
    }
}

/// Copy of a page dictionary with inherited attributes made explicit
fn detached_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = doc
        .get_dictionary(page_id)
        .with_context(|| format!("Page object {} {} R is not a dictionary", page_id.0, page_id.1))?
        .clone();

    for key in INHERITABLE {
        if !page.has(key) {
            if let Some(value) = inherited_attribute(doc, &page, key) {
                page.set(key, value);
            }
        }
    }

    Ok(page)
}

fn inherited_attribute(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    None
}
