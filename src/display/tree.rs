//! Nested-map serializer and text outline of the occurrence forest.
use crate::error::{Result, SurveyError};
use crate::store::{OccurrenceId, Survey, VertexId};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, Default)]
pub struct MapOptions {
    /// Leave out occurrence and vertex ids.
    pub no_ids: bool,
}

/// One occurrence with its children, in sibling order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<OccurrenceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertex_id: Option<VertexId>,
    #[serde(rename = "type")]
    pub kind: String,
    pub children: Vec<TreeMap>,
}

impl Survey {
    /// Every root of the forest as a nested map.
    pub fn as_map(&self, options: MapOptions) -> Result<Vec<TreeMap>> {
        self.forest.roots().iter().map(|&root| self.occurrence_map(root, options)).collect()
    }

    pub fn occurrence_map(&self, occurrence: OccurrenceId, options: MapOptions) -> Result<TreeMap> {
        if !self.forest.is_live(occurrence) {
            return Err(SurveyError::UnknownOccurrence(occurrence));
        }
        self.map_node(occurrence, options, 0)
    }

    fn map_node(&self, occ: OccurrenceId, options: MapOptions, depth: usize) -> Result<TreeMap> {
        let limit = self.config().max_depth;
        if depth >= limit {
            return Err(SurveyError::DepthLimit { limit });
        }
        let vertex = self.forest.vertex_of(occ);
        let children = self
            .forest
            .children(occ)
            .iter()
            .map(|&child| self.map_node(child, options, depth + 1))
            .collect::<Result<Vec<_>>>()?;
        Ok(TreeMap {
            id: (!options.no_ids).then_some(occ),
            vertex_id: (!options.no_ids).then_some(vertex),
            kind: self.kind_of(vertex).map_or("", |k| k.type_name()).to_string(),
            children,
        })
    }
}

/// Renders the forest as an indented tree of vertex texts, one root after another.
pub fn outline(survey: &Survey) -> String {
    let forest = survey.forest();
    let limit = survey.config().max_depth;
    let mut out = String::new();

    for &root in forest.roots() {
        let mut stack = vec![(root, String::new(), String::new(), 0usize)];
        while let Some((occ, prefix, stem, depth)) = stack.pop() {
            let text = survey.vertex(forest.vertex_of(occ)).map_or("?", |v| v.text.as_str());
            let _ = writeln!(out, "{}{}", prefix, text);
            if depth + 1 >= limit {
                continue;
            }
            let children = forest.children(occ);
            for (i, &child) in children.iter().enumerate().rev() {
                let (connector, inner) = if i + 1 == children.len() { ("`-- ", "    ") } else { ("|-- ", "|   ") };
                stack.push((child, format!("{}{}", stem, connector), format!("{}{}", stem, inner), depth + 1));
            }
        }
    }
    out
}
