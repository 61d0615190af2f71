//! Chunk planning.
//!
//! Splits the ordered module list into chunks: modules under
//! `node_modules` form the shared `vendors` chunk, everything else stays
//! in the entry chunk (`main`). The registry bootstrap itself is emitted
//! as a separate `runtime` chunk by the emitter.

use super::graph::{ModuleGraph, ModuleId};

/// A group of modules loaded together.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub name: String,
    /// Modules in topological order.
    pub modules: Vec<ModuleId>,
    /// The chunk whose evaluation kicks off the application.
    pub is_entry: bool,
}

/// The planned chunks, in load order.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    pub chunks: Vec<Chunk>,
}

impl ChunkPlan {
    /// Split `order` into vendors/main chunks.
    ///
    /// An empty vendors chunk is omitted entirely.
    #[must_use]
    pub fn split(graph: &ModuleGraph, order: &[ModuleId], split_vendors: bool) -> Self {
        let mut vendors = Vec::new();
        let mut main = Vec::new();

        for id in order {
            let is_vendor = graph.get(id).is_some_and(super::graph::Module::is_vendor);
            if split_vendors && is_vendor {
                vendors.push(id.clone());
            } else {
                main.push(id.clone());
            }
        }

        let mut chunks = Vec::new();
        if !vendors.is_empty() {
            chunks.push(Chunk {
                name: "vendors".to_string(),
                modules: vendors,
                is_entry: false,
            });
        }
        chunks.push(Chunk {
            name: "main".to_string(),
            modules: main,
            is_entry: true,
        });

        Self { chunks }
    }

    /// The entry chunk.
    #[must_use]
    pub fn entry(&self) -> &Chunk {
        self.chunks
            .iter()
            .find(|c| c.is_entry)
            .expect("plan always contains an entry chunk")
    }
}
