use std::collections::{BTreeSet, HashMap};

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::debug;

use crate::types::{
    DependencyGraph, ImportKind, ImportRecord, Language, ModuleEdge, ModuleNode, ParsedFile,
    ENTRY_POINT_NAMES,
};

/// Extensions probed when an import omits one, in probe order.
const RESOLVE_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".py"];

/// Suffixes probed for directory imports (`pkg` -> `pkg/index.*`).
const INDEX_SUFFIXES: &[&str] = &["", ".ts", ".js"];

#[derive(Debug, Clone)]
struct EdgeData {
    weight: u32,
    kinds: BTreeSet<ImportKind>,
}

/// Directed multigraph of modules under construction. Nodes are interned
/// into dense indices; parallel imports collapse into weighted edges.
pub struct ModuleGraph {
    graph: DiGraph<ModuleNode, EdgeData>,
    index: HashMap<String, NodeIndex>,
    edge_index: HashMap<(NodeIndex, NodeIndex), EdgeIndex>,
    external_packages: BTreeSet<String>,
    cycles: Vec<Vec<String>>,
}

impl ModuleGraph {
    /// Build the complete graph from parsed files: nodes, resolved edges,
    /// degrees, coupling and cycles.
    pub fn build(parsed: &[ParsedFile]) -> Self {
        let mut this = Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            edge_index: HashMap::new(),
            external_packages: BTreeSet::new(),
            cycles: Vec::new(),
        };

        // Pass 1 — one node per file, keyed by root-relative path.
        let mut ordered: Vec<&ParsedFile> = parsed.iter().collect();
        ordered.sort_by(|a, b| a.file.relative_path.cmp(&b.file.relative_path));
        for file in &ordered {
            this.add_module(&file.file.relative_path, file.file.language);
        }

        let lookup = build_lookup(&ordered);

        // Pass 2 — resolve imports against the known file set.
        for file in &ordered {
            for import in &file.imports {
                this.resolve_import(&file.file.relative_path, import, &lookup);
            }
        }

        this.compute_degrees();
        this.compute_coupling();
        this.cycles = this.find_cycles();
        this
    }

    fn add_module(&mut self, path: &str, language: Language) -> NodeIndex {
        if let Some(&idx) = self.index.get(path) {
            return idx;
        }
        let stem = file_stem(path);
        let node = ModuleNode {
            path: path.to_string(),
            name: module_name(path),
            language,
            in_degree: 0,
            out_degree: 0,
            coupling: 0.0,
            is_entry_point: ENTRY_POINT_NAMES
                .iter()
                .any(|n| stem.eq_ignore_ascii_case(n)),
            layer: None,
        };
        let idx = self.graph.add_node(node);
        self.index.insert(path.to_string(), idx);
        idx
    }

    fn resolve_import(
        &mut self,
        from_path: &str,
        import: &ImportRecord,
        lookup: &HashMap<String, String>,
    ) {
        if import.is_external {
            self.external_packages
                .insert(package_name(&import.source, import.kind));
            return;
        }

        // `from . import X` names siblings of the importing module; resolve
        // each imported name against the package directory.
        if import.kind == ImportKind::PythonFrom && is_dots_only(&import.source) {
            let base = python_relative_dir(from_path, &import.source);
            for name in import.names.as_deref().unwrap_or(&[]) {
                if name == "*" {
                    continue;
                }
                let candidate = normalize_path(&format!("{base}/{name}"));
                self.link(from_path, &candidate, import, lookup);
            }
            return;
        }

        let candidate = candidate_path(from_path, import);
        self.link(from_path, &candidate, import, lookup);
    }

    fn link(
        &mut self,
        from_path: &str,
        candidate: &str,
        import: &ImportRecord,
        lookup: &HashMap<String, String>,
    ) {
        let Some(target) = probe(candidate, lookup) else {
            debug!(
                from = from_path,
                source = %import.source,
                candidate,
                "unresolved import"
            );
            return;
        };
        let from_idx = self.index[from_path];
        let to_idx = self.index[&target];
        match self.edge_index.get(&(from_idx, to_idx)) {
            Some(&edge) => {
                let data = &mut self.graph[edge];
                data.weight += 1;
                data.kinds.insert(import.kind);
            }
            None => {
                let mut kinds = BTreeSet::new();
                kinds.insert(import.kind);
                let edge = self.graph.add_edge(from_idx, to_idx, EdgeData { weight: 1, kinds });
                self.edge_index.insert((from_idx, to_idx), edge);
            }
        }
    }

    fn compute_degrees(&mut self) {
        let mut in_degrees = vec![0u32; self.graph.node_count()];
        let mut out_degrees = vec![0u32; self.graph.node_count()];
        for edge in self.graph.edge_references() {
            out_degrees[edge.source().index()] += edge.weight().weight;
            in_degrees[edge.target().index()] += edge.weight().weight;
        }
        for idx in self.graph.node_indices() {
            let node = &mut self.graph[idx];
            node.in_degree = in_degrees[idx.index()];
            node.out_degree = out_degrees[idx.index()];
        }
    }

    fn compute_coupling(&mut self) {
        let max = self
            .graph
            .node_weights()
            .map(|n| n.in_degree + n.out_degree)
            .max()
            .unwrap_or(0)
            .max(1);
        for node in self.graph.node_weights_mut() {
            node.coupling = f64::from(node.in_degree + node.out_degree) / f64::from(max);
        }
    }

    /// Iterative DFS with a recursion-stack set. A neighbor already on the
    /// stack closes a cycle: the path slice from that neighbor onward plus
    /// the neighbor again is recorded, and traversal continues so multiple
    /// independent cycles are found. Self-loops are not reported.
    fn find_cycles(&self) -> Vec<Vec<String>> {
        let n = self.graph.node_count();
        let order = self.sorted_indices();
        let adjacency = self.sorted_adjacency(&order);

        let mut cycles = Vec::new();
        let mut visited = vec![false; n];
        let mut on_stack = vec![false; n];

        for &start in &order {
            if visited[start.index()] {
                continue;
            }
            // (node, next unexplored neighbor position)
            let mut stack: Vec<(NodeIndex, usize)> = vec![(start, 0)];
            let mut path: Vec<NodeIndex> = vec![start];
            visited[start.index()] = true;
            on_stack[start.index()] = true;

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                let neighbors = &adjacency[node.index()];
                if frame.1 >= neighbors.len() {
                    on_stack[node.index()] = false;
                    stack.pop();
                    path.pop();
                    continue;
                }
                let next = neighbors[frame.1];
                frame.1 += 1;

                if next == node {
                    continue;
                }
                if !visited[next.index()] {
                    visited[next.index()] = true;
                    on_stack[next.index()] = true;
                    stack.push((next, 0));
                    path.push(next);
                } else if on_stack[next.index()] {
                    let pos = path
                        .iter()
                        .position(|&p| p == next)
                        .expect("on-stack node is on the path");
                    let mut cycle: Vec<String> = path[pos..]
                        .iter()
                        .map(|&p| self.graph[p].path.clone())
                        .collect();
                    cycle.push(self.graph[next].path.clone());
                    cycles.push(cycle);
                }
            }
        }
        cycles
    }

    fn sorted_indices(&self) -> Vec<NodeIndex> {
        let mut order: Vec<NodeIndex> = self.graph.node_indices().collect();
        order.sort_by(|a, b| self.graph[*a].path.cmp(&self.graph[*b].path));
        order
    }

    fn sorted_adjacency(&self, order: &[NodeIndex]) -> Vec<Vec<NodeIndex>> {
        let mut adjacency = vec![Vec::new(); self.graph.node_count()];
        for &idx in order {
            let mut neighbors: Vec<NodeIndex> = self.graph.neighbors(idx).collect();
            neighbors.sort_by(|a, b| self.graph[*a].path.cmp(&self.graph[*b].path));
            adjacency[idx.index()] = neighbors;
        }
        adjacency
    }

    /// Freeze into the public snapshot: nodes ascending by path, edges
    /// ascending by (source, target), cycles in discovery order.
    pub fn finish(self) -> DependencyGraph {
        let mut graph = DependencyGraph {
            nodes: self
                .graph
                .node_weights()
                .map(|n| (n.path.clone(), n.clone()))
                .collect(),
            edges: Vec::with_capacity(self.graph.edge_count()),
            external_packages: self.external_packages,
            cycles: self.cycles,
        };
        for edge in self.graph.edge_references() {
            graph.edges.push(ModuleEdge {
                source: self.graph[edge.source()].path.clone(),
                target: self.graph[edge.target()].path.clone(),
                weight: edge.weight().weight,
                kinds: edge.weight().kinds.clone(),
            });
        }
        graph
            .edges
            .sort_by(|a, b| (a.source.as_str(), a.target.as_str()).cmp(&(b.source.as_str(), b.target.as_str())));
        graph
    }
}

/// Display name for a module path: basename without extension, except that
/// `index` files take their parent directory's name.
pub fn module_name(path: &str) -> String {
    let stem = file_stem(path);
    if stem.eq_ignore_ascii_case("index") {
        let dir = dir_of(path);
        if let Some(parent) = dir.rsplit('/').next().filter(|s| !s.is_empty()) {
            return parent.to_string();
        }
    }
    stem.to_string()
}

fn file_stem(path: &str) -> &str {
    let base = path.rsplit('/').next().unwrap_or(path);
    match base.rfind('.') {
        Some(0) | None => base,
        Some(pos) => &base[..pos],
    }
}

fn dir_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[..pos],
        None => "",
    }
}

fn is_dots_only(source: &str) -> bool {
    !source.is_empty() && source.chars().all(|c| c == '.')
}

/// Directory a dots-only Python source refers to: `.` is the importing
/// file's package, each extra dot walks one level up.
fn python_relative_dir(from_path: &str, dots: &str) -> String {
    let mut dir = dir_of(from_path).to_string();
    for _ in 1..dots.len() {
        dir = dir_of(&dir).to_string();
    }
    dir
}

/// Compute the root-relative candidate path for a non-external import.
fn candidate_path(from_path: &str, import: &ImportRecord) -> String {
    let source = match import.kind {
        ImportKind::PythonImport | ImportKind::PythonFrom => python_source_to_path(&import.source),
        ImportKind::JavaImport => import.source.replace('.', "/"),
        _ => import.source.clone(),
    };

    if source.starts_with('.') {
        let dir = dir_of(from_path);
        if dir.is_empty() {
            normalize_path(&source)
        } else {
            normalize_path(&format!("{dir}/{source}"))
        }
    } else {
        normalize_path(source.trim_start_matches('/'))
    }
}

/// Convert a dotted Python module path to a slash path, preserving leading
/// relative dots (`.sub.mod` -> `./sub/mod`, `..sib` -> `../sib`).
fn python_source_to_path(source: &str) -> String {
    let dots = source.chars().take_while(|&c| c == '.').count();
    let rest = &source[dots..];
    let tail = rest.replace('.', "/");
    match dots {
        0 => tail,
        1 => format!("./{tail}"),
        n => {
            let ups = "../".repeat(n - 1);
            format!("{ups}{tail}")
        }
    }
}

/// Collapse `.` and `..` segments of a forward-slash path. Unresolvable
/// leading `..` segments are kept; they simply never match the lookup.
fn normalize_path(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(out.last(), Some(&"..")) || out.is_empty() {
                    out.push("..");
                } else {
                    out.pop();
                }
            }
            s => out.push(s),
        }
    }
    out.join("/")
}

/// External package name: scoped specifiers keep their first two segments,
/// everything else keeps its first segment. Dotted module paths (Python,
/// Java) are segmented on dots.
fn package_name(source: &str, kind: ImportKind) -> String {
    let slashed = match kind {
        ImportKind::PythonImport | ImportKind::PythonFrom | ImportKind::JavaImport => {
            source.replace('.', "/")
        }
        _ => source.to_string(),
    };
    let mut segments = slashed.split('/').filter(|s| !s.is_empty());
    if slashed.starts_with('@') {
        let scope = segments.next().unwrap_or(&slashed);
        match segments.next() {
            Some(pkg) => format!("{scope}/{pkg}"),
            None => scope.to_string(),
        }
    } else {
        segments.next().unwrap_or(&slashed).to_string()
    }
}

/// File lookup table: every file is reachable by its relative path, by that
/// path with the extension stripped, and (for `index` files) by its parent
/// directory. First writer wins, so collisions resolve to the
/// lexicographically smallest path.
fn build_lookup(ordered: &[&ParsedFile]) -> HashMap<String, String> {
    let mut lookup = HashMap::new();
    for file in ordered {
        let rel = &file.file.relative_path;
        lookup.entry(rel.clone()).or_insert_with(|| rel.clone());

        let stem_path = strip_extension(rel);
        if stem_path != *rel {
            lookup.entry(stem_path).or_insert_with(|| rel.clone());
        }

        if file_stem(rel).eq_ignore_ascii_case("index") {
            let dir = dir_of(rel);
            if !dir.is_empty() {
                lookup.entry(dir.to_string()).or_insert_with(|| rel.clone());
            }
        }
    }
    lookup
}

fn strip_extension(path: &str) -> String {
    let dir = dir_of(path);
    let stem = file_stem(path);
    if dir.is_empty() {
        stem.to_string()
    } else {
        format!("{dir}/{stem}")
    }
}

/// Probe the lookup table: exact, extension-stripped, known extensions
/// appended, then `/index` variants. First hit wins.
fn probe(candidate: &str, lookup: &HashMap<String, String>) -> Option<String> {
    if let Some(hit) = lookup.get(candidate) {
        return Some(hit.clone());
    }
    let stripped = strip_extension(candidate);
    if stripped != candidate {
        if let Some(hit) = lookup.get(&stripped) {
            return Some(hit.clone());
        }
    }
    for ext in RESOLVE_EXTENSIONS {
        if let Some(hit) = lookup.get(&format!("{candidate}{ext}")) {
            return Some(hit.clone());
        }
    }
    for suffix in INDEX_SUFFIXES {
        if let Some(hit) = lookup.get(&format!("{candidate}/index{suffix}")) {
            return Some(hit.clone());
        }
    }
    None
}
