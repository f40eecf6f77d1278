//! Builds pipeline graphs from node specs or directly from configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::{InputConfig, PipelineConfig};
use crate::encoder::{encoder_invocation, EncoderConfig};
use crate::mirror::{sync_invocation, MirrorConfig};
use crate::node::NodeRole;
use crate::packager::{packager_invocation, PackagerConfig, PackagerStream};

use super::error::GraphError;
use super::types::{handoff_path, Handoff, NodeSpec, PipelineGraph};

/// Everything needed to derive a graph from configuration.
pub struct GraphParams<'a> {
    pub output_dir: &'a Path,
    pub pipe_dir: &'a Path,
    pub inputs: &'a InputConfig,
    pub pipeline: &'a PipelineConfig,
    pub destination: Option<&'a str>,
    pub encoder: &'a EncoderConfig,
    pub packager: &'a PackagerConfig,
    pub mirror: &'a MirrorConfig,
}

/// Assembles node specs into a validated, ordered graph.
pub struct GraphBuilder {
    pipe_dir: PathBuf,
    specs: Vec<NodeSpec>,
}

impl GraphBuilder {
    pub fn new(pipe_dir: impl Into<PathBuf>) -> Self {
        Self {
            pipe_dir: pipe_dir.into(),
            specs: Vec::new(),
        }
    }

    pub fn add_node(&mut self, spec: NodeSpec) -> &mut Self {
        self.specs.push(spec);
        self
    }

    /// Validate handoff ownership, compute launch groups, and produce the
    /// final graph.
    ///
    /// Invariants enforced here:
    /// - every handoff has exactly one writer and exactly one reader
    /// - the graph contains at least one packager node
    ///
    /// Launch groups are the connected components over blocking handoffs.
    /// Groups are ordered by the declaration index of their first member,
    /// except that groups containing an uploader always come last (the
    /// mirror must not start before the packagers it mirrors). Members
    /// keep declaration order inside their group, for determinism.
    pub fn build(self) -> Result<PipelineGraph, GraphError> {
        let specs = self.specs;

        // Handoff usage, keeping first-seen order for deterministic output.
        let mut names: Vec<String> = Vec::new();
        let mut writers: HashMap<String, Vec<usize>> = HashMap::new();
        let mut readers: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, spec) in specs.iter().enumerate() {
            for name in &spec.writes {
                if !writers.contains_key(name) && !readers.contains_key(name) {
                    names.push(name.clone());
                }
                writers.entry(name.clone()).or_default().push(idx);
            }
            for name in &spec.reads {
                if !writers.contains_key(name) && !readers.contains_key(name) {
                    names.push(name.clone());
                }
                readers.entry(name.clone()).or_default().push(idx);
            }
        }

        for name in &names {
            let writer_count = writers.get(name).map_or(0, Vec::len);
            let reader_count = readers.get(name).map_or(0, Vec::len);
            if writer_count > 1 {
                return Err(GraphError::DuplicateWriter {
                    handoff: name.clone(),
                });
            }
            if reader_count > 1 {
                return Err(GraphError::DuplicateReader {
                    handoff: name.clone(),
                });
            }
            if writer_count == 0 {
                return Err(GraphError::MissingWriter {
                    handoff: name.clone(),
                });
            }
            if reader_count == 0 {
                return Err(GraphError::MissingReader {
                    handoff: name.clone(),
                });
            }
        }

        if !specs.iter().any(|s| s.role == NodeRole::Packager) {
            return Err(GraphError::NoOutputs);
        }

        // Connected components over blocking handoffs (all pipe handoffs
        // block on open).
        let mut parent: Vec<usize> = (0..specs.len()).collect();
        for name in &names {
            let writer = writers[name][0];
            let reader = readers[name][0];
            union(&mut parent, writer, reader);
        }

        let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
        for idx in 0..specs.len() {
            let root = find(&mut parent, idx);
            components.entry(root).or_default().push(idx);
        }

        let mut groups: Vec<Vec<usize>> = components.into_values().collect();
        groups.sort_by_key(|members| {
            let has_uploader = members
                .iter()
                .any(|&i| specs[i].role == NodeRole::Uploader);
            (has_uploader, members[0])
        });

        // Lay specs out in launch order; groups become contiguous ranges.
        let mut slots: Vec<Option<NodeSpec>> = specs.into_iter().map(Some).collect();
        let mut ordered = Vec::with_capacity(slots.len());
        let mut ranges = Vec::with_capacity(groups.len());
        for members in groups {
            let start = ordered.len();
            for idx in members {
                ordered.push(slots[idx].take().expect("node spec consumed twice"));
            }
            ranges.push(start..ordered.len());
        }

        let handoffs = names
            .into_iter()
            .map(|name| {
                let path = handoff_path(&self.pipe_dir, &name);
                Handoff {
                    name,
                    path,
                    blocking: true,
                }
            })
            .collect();

        Ok(PipelineGraph {
            specs: ordered,
            groups: ranges,
            handoffs,
        })
    }
}

fn find(parent: &mut [usize], mut idx: usize) -> usize {
    while parent[idx] != idx {
        parent[idx] = parent[parent[idx]];
        idx = parent[idx];
    }
    idx
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let root_a = find(parent, a);
    let root_b = find(parent, b);
    if root_a != root_b {
        parent[root_b.max(root_a)] = root_a.min(root_b);
    }
}

impl PipelineGraph {
    /// Derive the full graph from configuration: one encoder node per
    /// input/variant pairing, one packager node per packaging unit, and
    /// an uploader node iff a destination is configured.
    pub fn from_config(params: &GraphParams<'_>) -> Result<PipelineGraph, GraphError> {
        let mut builder = GraphBuilder::new(params.pipe_dir);

        for input in &params.inputs.inputs {
            for variant in &params.pipeline.variants {
                if variant.media_type() != input.media_type {
                    continue;
                }
                let handoff = format!("{}_{}", input.name, variant.name);
                let pipe = handoff_path(params.pipe_dir, &handoff);
                let invocation = encoder_invocation(
                    params.encoder,
                    input,
                    variant,
                    &pipe,
                    params.pipeline.streaming_mode,
                );
                builder.add_node(NodeSpec {
                    name: format!("enc_{}", handoff),
                    role: NodeRole::Encoder,
                    invocation,
                    reads: vec![],
                    writes: vec![handoff],
                });
            }
        }

        for unit in &params.pipeline.packaging {
            let selected = params.pipeline.variants.iter().filter(|v| {
                unit.variants
                    .as_ref()
                    .map_or(true, |names| names.contains(&v.name))
            });

            let mut reads = Vec::new();
            let mut streams = Vec::new();
            for variant in selected {
                for input in &params.inputs.inputs {
                    if input.media_type != variant.media_type() {
                        continue;
                    }
                    let handoff = format!("{}_{}", input.name, variant.name);
                    reads.push(handoff.clone());
                    streams.push(PackagerStream {
                        label: handoff.clone(),
                        media_type: input.media_type,
                        pipe: handoff_path(params.pipe_dir, &handoff),
                    });
                }
            }
            if streams.is_empty() {
                return Err(GraphError::EmptyPackagingUnit {
                    unit: unit.name.clone(),
                });
            }

            let invocation = packager_invocation(
                params.packager,
                unit,
                &streams,
                params.output_dir,
                params.pipeline.streaming_mode,
            );
            builder.add_node(NodeSpec {
                name: format!("pkg_{}", unit.name),
                role: NodeRole::Packager,
                invocation,
                reads,
                writes: vec![],
            });
        }

        if let Some(destination) = params.destination {
            builder.add_node(NodeSpec {
                name: "uploader".to_string(),
                role: NodeRole::Uploader,
                invocation: sync_invocation(params.mirror, params.output_dir, destination),
                reads: vec![],
                writes: vec![],
            });
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Invocation;

    fn spec(name: &str, role: NodeRole, reads: &[&str], writes: &[&str]) -> NodeSpec {
        NodeSpec {
            name: name.to_string(),
            role,
            invocation: Invocation::new("true", vec![]),
            reads: reads.iter().map(|s| s.to_string()).collect(),
            writes: writes.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_build_single_component() {
        let mut builder = GraphBuilder::new("/tmp/pipes");
        builder.add_node(spec("enc", NodeRole::Encoder, &[], &["h"]));
        builder.add_node(spec("pkg", NodeRole::Packager, &["h"], &[]));

        let graph = builder.build().unwrap();
        assert_eq!(graph.nodes().len(), 2);
        assert_eq!(graph.groups().len(), 1);
        assert_eq!(graph.groups()[0], 0..2);
        assert_eq!(graph.handoffs().len(), 1);
        assert!(graph.handoffs()[0].blocking);
        assert_eq!(
            graph.handoffs()[0].path,
            Path::new("/tmp/pipes/h.pipe")
        );
    }

    #[test]
    fn test_build_separate_components_keep_declaration_order() {
        let mut builder = GraphBuilder::new("/tmp/pipes");
        builder.add_node(spec("enc_a", NodeRole::Encoder, &[], &["a"]));
        builder.add_node(spec("enc_b", NodeRole::Encoder, &[], &["b"]));
        builder.add_node(spec("pkg_a", NodeRole::Packager, &["a"], &[]));
        builder.add_node(spec("pkg_b", NodeRole::Packager, &["b"], &[]));

        let graph = builder.build().unwrap();
        assert_eq!(graph.groups().len(), 2);
        let first: Vec<_> = graph.nodes()[graph.groups()[0].clone()]
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(first, vec!["enc_a", "pkg_a"]);
        let second: Vec<_> = graph.nodes()[graph.groups()[1].clone()]
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(second, vec!["enc_b", "pkg_b"]);
    }

    #[test]
    fn test_build_uploader_group_is_last() {
        let mut builder = GraphBuilder::new("/tmp/pipes");
        builder.add_node(spec("uploader", NodeRole::Uploader, &[], &[]));
        builder.add_node(spec("enc", NodeRole::Encoder, &[], &["h"]));
        builder.add_node(spec("pkg", NodeRole::Packager, &["h"], &[]));

        let graph = builder.build().unwrap();
        assert_eq!(graph.groups().len(), 2);
        let last_range = graph.groups().last().unwrap().clone();
        assert_eq!(graph.nodes()[last_range][0].name, "uploader");
    }

    #[test]
    fn test_build_duplicate_writer_fails() {
        let mut builder = GraphBuilder::new("/tmp/pipes");
        builder.add_node(spec("enc_a", NodeRole::Encoder, &[], &["h"]));
        builder.add_node(spec("enc_b", NodeRole::Encoder, &[], &["h"]));
        builder.add_node(spec("pkg", NodeRole::Packager, &["h"], &[]));

        let result = builder.build();
        assert!(matches!(
            result,
            Err(GraphError::DuplicateWriter { handoff }) if handoff == "h"
        ));
    }

    #[test]
    fn test_build_duplicate_reader_fails() {
        let mut builder = GraphBuilder::new("/tmp/pipes");
        builder.add_node(spec("enc", NodeRole::Encoder, &[], &["h"]));
        builder.add_node(spec("pkg_a", NodeRole::Packager, &["h"], &[]));
        builder.add_node(spec("pkg_b", NodeRole::Packager, &["h"], &[]));

        assert!(matches!(
            builder.build(),
            Err(GraphError::DuplicateReader { .. })
        ));
    }

    #[test]
    fn test_build_dangling_handoff_fails() {
        let mut builder = GraphBuilder::new("/tmp/pipes");
        builder.add_node(spec("enc", NodeRole::Encoder, &[], &["h"]));
        builder.add_node(spec("pkg", NodeRole::Packager, &["other"], &[]));

        let result = builder.build();
        assert!(matches!(
            result,
            Err(GraphError::MissingReader { .. }) | Err(GraphError::MissingWriter { .. })
        ));
    }

    #[test]
    fn test_build_no_packager_fails() {
        let mut builder = GraphBuilder::new("/tmp/pipes");
        builder.add_node(spec("enc", NodeRole::Encoder, &[], &[]));

        assert!(matches!(builder.build(), Err(GraphError::NoOutputs)));
    }
}
