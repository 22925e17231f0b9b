pub mod gltf;

use anyhow::Result;
use futures::channel::oneshot;
use std::path::{Path, PathBuf};

use crate::geometry::Geometry;

pub use gltf::{load_first_child_geometry, load_first_child_geometry_from_slice, GltfLoader};

/// Source of mesh geometry
pub trait AssetLoader: Send + 'static {
    fn load(&self, path: &Path) -> Result<Geometry>;
}

impl<F> AssetLoader for F
where
    F: Fn(&Path) -> Result<Geometry> + Send + 'static,
{
    fn load(&self, path: &Path) -> Result<Geometry> {
        self(path)
    }
}

/// State of a mesh load checked from the frame loop
#[derive(Debug)]
pub enum MeshPoll {
    Pending,
    Ready(Result<Geometry>),
    /// The loader went away without answering
    Dropped,
}

/// Receiving half of a mesh load running elsewhere
#[derive(Debug)]
pub struct PendingMesh {
    path: PathBuf,
    receiver: oneshot::Receiver<Result<Geometry>>,
}

impl PendingMesh {
    /// Unconnected load; the caller decides when (or whether) to answer
    pub fn channel(path: impl Into<PathBuf>) -> (oneshot::Sender<Result<Geometry>>, PendingMesh) {
        let (sender, receiver) = oneshot::channel();
        (
            sender,
            PendingMesh {
                path: path.into(),
                receiver,
            },
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Non-blocking check
    pub fn poll(&mut self) -> MeshPoll {
        match self.receiver.try_recv() {
            Ok(Some(result)) => MeshPoll::Ready(result),
            Ok(None) => MeshPoll::Pending,
            Err(oneshot::Canceled) => MeshPoll::Dropped,
        }
    }
}

/// Runs `loader` on a worker thread
pub fn spawn_mesh_load<L: AssetLoader>(loader: L, path: impl Into<PathBuf>) -> PendingMesh {
    let path = path.into();
    let (sender, pending) = PendingMesh::channel(path.clone());

    let spawned = std::thread::Builder::new()
        .name("mesh-loader".to_string())
        .spawn(move || {
            let result = loader.load(&path);
            // Receiver may be gone if the app already quit
            let _ = sender.send(result);
        });

    if let Err(e) = spawned {
        log::warn!("Failed to start mesh loader thread: {}", e);
    }

    pending
}
