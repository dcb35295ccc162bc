/// Asset loading: fetch through a host source, parse, report back by ticket
///
/// Results never return to the caller directly. Every progress update and the
/// single terminal outcome of a `load` call are posted to a `LoadInbox`
/// tagged with the `LoadTicket` the caller supplied, and the viewer drains
/// the inbox on its own schedule.
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::asset::{LoadedObject, MaterialLibrary};
use crate::error::{FetchError, LoadError, ParseError};
use crate::fbx::parse_fbx;
use crate::format::{materials_url, AssetFormat};
use crate::mtl::parse_mtl;
use crate::obj::parse_obj;

pub const STAGE_MATERIALS: &str = "MATERIALS";
pub const STAGE_OBJ: &str = "OBJ OBJECTS";
pub const STAGE_FBX: &str = "FBX OBJECTS";

pub type FetchCallback = Box<dyn FnOnce(Result<Vec<u8>, FetchError>)>;

/// Where asset bytes come from (filesystem, HTTP, ...)
///
/// `on_done` must be called exactly once, either before `fetch` returns or
/// later from the host's event loop.
pub trait AssetSource {
    fn fetch(&self, url: &str, on_done: FetchCallback);
}

/// Identifies the load cycle a message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
}

#[derive(Debug)]
pub enum LoadMessage {
    Progress {
        ticket: LoadTicket,
        detail: String,
    },
    Finished {
        ticket: LoadTicket,
        outcome: Result<LoadedObject, LoadError>,
    },
}

impl LoadMessage {
    pub fn ticket(&self) -> LoadTicket {
        match self {
            LoadMessage::Progress { ticket, .. } | LoadMessage::Finished { ticket, .. } => *ticket,
        }
    }
}

/// Shared queue of load messages awaiting the viewer
#[derive(Debug, Clone, Default)]
pub struct LoadInbox {
    queue: Rc<RefCell<VecDeque<LoadMessage>>>,
}

impl LoadInbox {
    pub fn post(&self, message: LoadMessage) {
        self.queue.borrow_mut().push_back(message);
    }

    /// Take every pending message, oldest first
    pub fn drain(&self) -> Vec<LoadMessage> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    fn progress(&self, ticket: LoadTicket, detail: &str) {
        self.post(LoadMessage::Progress {
            ticket,
            detail: detail.to_string(),
        });
    }

    fn finish(&self, ticket: LoadTicket, outcome: Result<LoadedObject, LoadError>) {
        self.post(LoadMessage::Finished { ticket, outcome });
    }
}

/// Format-aware loader in front of an `AssetSource`
pub struct AssetLoader {
    source: Rc<dyn AssetSource>,
    inbox: LoadInbox,
}

impl AssetLoader {
    pub fn new(source: Rc<dyn AssetSource>, inbox: LoadInbox) -> Self {
        Self { source, inbox }
    }

    pub fn load(&self, ticket: LoadTicket, url: &str, format: AssetFormat) {
        debug!("loading {} as {} (generation {})", url, format, ticket.generation);
        match format {
            AssetFormat::Obj => self.load_obj(ticket, url),
            AssetFormat::Fbx => self.load_fbx(ticket, url),
        }
    }

    fn load_obj(&self, ticket: LoadTicket, url: &str) {
        self.inbox.progress(ticket, STAGE_MATERIALS);

        let source = Rc::clone(&self.source);
        let inbox = self.inbox.clone();
        let mtl_url = materials_url(url);
        let url = url.to_string();

        self.source.fetch(
            &mtl_url,
            Box::new(move |result| {
                let materials = match result {
                    Ok(bytes) => match decode_text(&bytes).and_then(|text| parse_mtl(&text)) {
                        Ok(library) => Some(library),
                        Err(e) => {
                            warn!("material library for {} unusable, continuing without: {}", url, e);
                            None
                        }
                    },
                    Err(e) => {
                        warn!("material library unavailable, continuing without: {}", e);
                        None
                    }
                };

                inbox.progress(ticket, STAGE_OBJ);
                let name = object_name(&url);
                source.fetch(
                    &url,
                    Box::new(move |result| {
                        inbox.finish(ticket, build_obj(name, result, materials));
                    }),
                );
            }),
        );
    }

    fn load_fbx(&self, ticket: LoadTicket, url: &str) {
        self.inbox.progress(ticket, STAGE_FBX);

        let inbox = self.inbox.clone();
        let name = object_name(url);
        self.source.fetch(
            url,
            Box::new(move |result| {
                inbox.finish(ticket, build_fbx(name, result));
            }),
        );
    }
}

fn build_obj(
    name: String,
    fetched: Result<Vec<u8>, FetchError>,
    materials: Option<MaterialLibrary>,
) -> Result<LoadedObject, LoadError> {
    const FORMAT: &str = "OBJ";
    let bytes = fetched.map_err(|source| LoadError::Fetch { format: FORMAT, source })?;
    let document = decode_text(&bytes)
        .and_then(|text| parse_obj(&text))
        .map_err(|source| LoadError::Parse { format: FORMAT, source })?;

    let mut object = LoadedObject::new(name, AssetFormat::Obj, document.mesh);
    object.materials = materials;
    Ok(object)
}

fn build_fbx(name: String, fetched: Result<Vec<u8>, FetchError>) -> Result<LoadedObject, LoadError> {
    const FORMAT: &str = "FBX";
    let bytes = fetched.map_err(|source| LoadError::Fetch { format: FORMAT, source })?;
    let document = parse_fbx(&bytes).map_err(|source| LoadError::Parse { format: FORMAT, source })?;

    let mut object = LoadedObject::new(name, AssetFormat::Fbx, document.mesh);
    object.animations = document.animations;
    Ok(object)
}

fn decode_text(bytes: &[u8]) -> Result<String, ParseError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| ParseError::Encoding)
}

/// File stem of the last path segment
fn object_name(url: &str) -> String {
    let file = url.rsplit(['/', '\\']).next().unwrap_or(url);
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;

    /// In-memory source that can hold callbacks back until released
    #[derive(Default)]
    pub(crate) struct MemorySource {
        files: RefCell<HashMap<String, Vec<u8>>>,
        deferred: Cell<bool>,
        pending: RefCell<Vec<(String, FetchCallback)>>,
        pub(crate) requested: RefCell<Vec<String>>,
    }

    impl MemorySource {
        pub(crate) fn with(files: &[(&str, &[u8])]) -> Rc<Self> {
            let source = Self::default();
            for (url, bytes) in files {
                source.files.borrow_mut().insert(url.to_string(), bytes.to_vec());
            }
            Rc::new(source)
        }

        pub(crate) fn defer(&self, deferred: bool) {
            self.deferred.set(deferred);
        }

        fn respond(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.files
                .borrow()
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::NotFound { url: url.to_string() })
        }

        /// Complete the oldest held-back fetch; false if none was pending
        pub(crate) fn release_one(&self) -> bool {
            let next = {
                let mut pending = self.pending.borrow_mut();
                if pending.is_empty() {
                    None
                } else {
                    Some(pending.remove(0))
                }
            };
            match next {
                Some((url, on_done)) => {
                    on_done(self.respond(&url));
                    true
                }
                None => false,
            }
        }

        pub(crate) fn release_all(&self) {
            while self.release_one() {}
        }
    }

    impl AssetSource for MemorySource {
        fn fetch(&self, url: &str, on_done: FetchCallback) {
            self.requested.borrow_mut().push(url.to_string());
            if self.deferred.get() {
                self.pending.borrow_mut().push((url.to_string(), on_done));
            } else {
                on_done(self.respond(url));
            }
        }
    }

    pub(crate) const TRIANGLE_OBJ: &[u8] = b"mtllib tri.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl red\nf 1 2 3\n";
    pub(crate) const RED_MTL: &[u8] = b"newmtl red\nKd 1 0 0\n";
    const BROKEN_MTL: &[u8] = b"Kd 1 0 0\n";

    const TICKET: LoadTicket = LoadTicket { generation: 1 };

    fn finished(inbox: &LoadInbox) -> Vec<Result<LoadedObject, LoadError>> {
        inbox
            .drain()
            .into_iter()
            .filter_map(|m| match m {
                LoadMessage::Finished { outcome, .. } => Some(outcome),
                LoadMessage::Progress { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_obj_with_materials() {
        let source = MemorySource::with(&[("models/tri.obj", TRIANGLE_OBJ), ("models/tri.mtl", RED_MTL)]);
        let inbox = LoadInbox::default();
        AssetLoader::new(source.clone(), inbox.clone()).load(TICKET, "models/tri.obj", AssetFormat::Obj);

        assert_eq!(*source.requested.borrow(), vec!["models/tri.mtl", "models/tri.obj"]);
        let outcomes = finished(&inbox);
        assert_eq!(outcomes.len(), 1);
        let object = outcomes[0].as_ref().unwrap();
        assert_eq!(object.name, "tri");
        assert!(object.materials.is_some());
    }

    #[test]
    fn test_obj_without_material_file_still_loads() {
        let source = MemorySource::with(&[("tri.obj", TRIANGLE_OBJ)]);
        let inbox = LoadInbox::default();
        AssetLoader::new(source, inbox.clone()).load(TICKET, "tri.obj", AssetFormat::Obj);

        let outcomes = finished(&inbox);
        let object = outcomes[0].as_ref().unwrap();
        assert_eq!(object.mesh.triangles.len(), 1);
        assert!(object.materials.is_none());
    }

    #[test]
    fn test_broken_material_file_is_skipped() {
        let source = MemorySource::with(&[("tri.obj", TRIANGLE_OBJ), ("tri.mtl", BROKEN_MTL)]);
        let inbox = LoadInbox::default();
        AssetLoader::new(source, inbox.clone()).load(TICKET, "tri.obj", AssetFormat::Obj);
        assert!(finished(&inbox)[0].as_ref().unwrap().materials.is_none());
    }

    #[test]
    fn test_missing_mesh_is_a_single_failure() {
        let source = MemorySource::with(&[]);
        let inbox = LoadInbox::default();
        AssetLoader::new(source, inbox.clone()).load(TICKET, "gone.fbx", AssetFormat::Fbx);

        let outcomes = finished(&inbox);
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], Err(LoadError::Fetch { format: "FBX", .. })));
    }

    #[test]
    fn test_fbx_carries_animations() {
        let bytes = crate::fbx::tests::quad_fbx(false);
        let source = MemorySource::with(&[("robot.fbx", bytes.as_slice())]);
        let inbox = LoadInbox::default();
        AssetLoader::new(source, inbox.clone()).load(TICKET, "robot.fbx", AssetFormat::Fbx);

        let outcomes = finished(&inbox);
        let object = outcomes[0].as_ref().unwrap();
        assert_eq!(object.format, AssetFormat::Fbx);
        assert_eq!(object.animations[0].name, "Walk");
    }

    #[test]
    fn test_progress_messages_carry_the_ticket() {
        let source = MemorySource::with(&[]);
        source.defer(true);
        let inbox = LoadInbox::default();
        let ticket = LoadTicket { generation: 9 };
        AssetLoader::new(source.clone(), inbox.clone()).load(ticket, "a.obj", AssetFormat::Obj);

        assert_eq!(inbox.len(), 1);
        source.release_all();
        let messages = inbox.drain();
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|m| m.ticket() == ticket));
    }

    #[test]
    fn test_object_name() {
        assert_eq!(object_name("https://host/models/Chair.v2.obj"), "Chair.v2");
        assert_eq!(object_name("C:\\models\\robot.fbx"), "robot");
        assert_eq!(object_name("noext"), "noext");
    }
}
