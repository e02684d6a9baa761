//! Search expressions: parsing raw JSON into a validated tree and compiling
//! the tree into a [`Clause`].
//!
//! An expression node is a JSON object with exactly one key, the component
//! tag. `and`/`or` take an array of nodes, every other tag takes the
//! component's parameter. `{}` is the empty expression and constrains
//! nothing.

use crate::clause::Clause;
use crate::components::{index_path, Component, ComponentTag, ParseContext, Relation};
use crate::dataset::DatasetAliases;
use crate::error::ValidationErrors;
use crate::vocabulary::Vocabularies;
use serde_json::Value as JsonValue;

/// Field name of the expression in a search request; root of error paths.
pub const QUERY_FIELD: &str = "query";

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Component(Component),
    And(Vec<Expression>),
    Or(Vec<Expression>),
}

impl Expression {
    pub fn compile(&self) -> Clause {
        match self {
            Self::Component(component) => component.compile(),
            Self::And(children) => Clause::and(children.iter().map(Self::compile).collect()),
            Self::Or(children) => Clause::or(children.iter().map(Self::compile).collect()),
        }
    }

    /// HGNC ids named by non-negated gene filters, in query order.
    pub fn gene_ids(&self) -> Vec<u64> {
        let mut ids = Vec::new();
        self.collect_gene_ids(&mut ids);
        ids
    }

    fn collect_gene_ids(&self, ids: &mut Vec<u64>) {
        match self {
            Self::Component(Component::Gene(gene)) if gene.relation == Relation::Eq => {
                for id in &gene.hgnc_ids {
                    if !ids.contains(id) {
                        ids.push(*id);
                    }
                }
            }
            Self::Component(_) => {}
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_gene_ids(ids);
                }
            }
        }
    }
}

/// Validates and compiles expressions against a set of reference data.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionCompiler<'a> {
    vocabularies: &'a Vocabularies,
    aliases: &'a DatasetAliases,
}

impl<'a> ExpressionCompiler<'a> {
    pub fn new(vocabularies: &'a Vocabularies, aliases: &'a DatasetAliases) -> Self {
        Self {
            vocabularies,
            aliases,
        }
    }

    /// Validate the whole tree. `Ok(None)` is the empty expression.
    pub fn parse(&self, raw: &JsonValue) -> Result<Option<Expression>, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let expression = self.parse_into(raw, &mut errors);
        errors.into_result(expression)
    }

    /// Validate and compile. Nothing is compiled unless the whole tree is valid.
    pub fn compile(&self, raw: &JsonValue) -> Result<Option<Clause>, ValidationErrors> {
        Ok(self.parse(raw)?.map(|expression| expression.compile()))
    }

    pub(crate) fn parse_into(
        &self,
        raw: &JsonValue,
        errors: &mut ValidationErrors,
    ) -> Option<Expression> {
        let mut cx = ParseContext::new(self.vocabularies, self.aliases);
        let expression = parse_node(raw, QUERY_FIELD, &mut cx);
        let valid = cx.errors.is_empty();
        errors.extend(cx.errors);
        expression.filter(|_| valid)
    }
}

fn parse_node(raw: &JsonValue, path: &str, cx: &mut ParseContext<'_>) -> Option<Expression> {
    let Some(node) = raw.as_object() else {
        cx.error(path, "contains objects other than Hash");
        return None;
    };

    let mut entries = node.iter();
    let (key, value) = entries.next()?;
    if entries.next().is_some() {
        cx.error(path, "contains unexpected component");
        return None;
    }

    let Some(tag) = ComponentTag::from_str(key) else {
        cx.error(
            path,
            format!("must consist of {}", ComponentTag::vocabulary_sentence()),
        );
        return None;
    };

    let child = format!("{path}.{key}");
    match tag {
        ComponentTag::And => parse_children(value, &child, cx).map(Expression::And),
        ComponentTag::Or => parse_children(value, &child, cx).map(Expression::Or),
        _ => Component::parse(tag, value, &child, cx).map(Expression::Component),
    }
}

/// Children of `and`/`or`. Empty sub-expressions are dropped; a combinator
/// left without children constrains nothing.
fn parse_children(
    raw: &JsonValue,
    path: &str,
    cx: &mut ParseContext<'_>,
) -> Option<Vec<Expression>> {
    let Some(items) = raw.as_array() else {
        cx.error(path, "must be an array of a component");
        return None;
    };

    let children: Vec<Expression> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| parse_node(item, &index_path(path, i), cx))
        .collect();

    (!children.is_empty()).then_some(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixtures() -> (Vocabularies, DatasetAliases) {
        (Vocabularies::bundled().unwrap(), DatasetAliases::default())
    }

    #[test]
    fn empty_expression_is_no_constraint() {
        let (vocab, aliases) = fixtures();
        let compiler = ExpressionCompiler::new(&vocab, &aliases);
        assert_eq!(compiler.compile(&json!({})).unwrap(), None);
    }

    #[test]
    fn and_is_conjunction_of_children() {
        let (vocab, aliases) = fixtures();
        let compiler = ExpressionCompiler::new(&vocab, &aliases);

        let a = json!({ "location": { "chromosome": "1", "position": 12345 } });
        let b = json!({ "gene": { "relation": "eq", "terms": [404] } });

        let left = compiler.compile(&a).unwrap().unwrap();
        let right = compiler.compile(&b).unwrap().unwrap();
        let both = compiler
            .compile(&json!({ "and": [a.clone(), b.clone()] }))
            .unwrap()
            .unwrap();
        assert_eq!(both, Clause::and(vec![left.clone(), right.clone()]));

        let either = compiler.compile(&json!({ "or": [a, b] })).unwrap().unwrap();
        assert_eq!(either, Clause::or(vec![left, right]));
    }

    #[test]
    fn multi_key_node_is_rejected() {
        let (vocab, aliases) = fixtures();
        let compiler = ExpressionCompiler::new(&vocab, &aliases);

        let errors = compiler
            .compile(&json!({
                "location": { "chromosome": "1" },
                "gene": { "terms": [404] }
            }))
            .unwrap_err();
        assert_eq!(errors.messages(), vec!["query contains unexpected component"]);
    }

    #[test]
    fn unknown_tag_lists_acceptable_components() {
        let (vocab, aliases) = fixtures();
        let compiler = ExpressionCompiler::new(&vocab, &aliases);

        let errors = compiler
            .compile(&json!({ "and": [{ "chromosome": "1" }] }))
            .unwrap_err();
        let message = &errors.messages()[0];
        assert!(message.starts_with("query.and[0] must consist of 'id', 'location'"));
    }

    #[test]
    fn errors_are_collected_across_the_tree() {
        let (vocab, aliases) = fixtures();
        let compiler = ExpressionCompiler::new(&vocab, &aliases);

        let errors = compiler
            .compile(&json!({
                "or": [
                    { "location": { "chromosome": "99" } },
                    { "type": { "terms": ["SO_0001483"] } },
                    { "sift": { "terms": ["X"] } }
                ]
            }))
            .unwrap_err();
        assert!(errors.has_field("query.or[0].location.chromosome"));
        assert!(errors.has_field("query.or[2].sift.terms[0]"));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn non_object_node_is_rejected() {
        let (vocab, aliases) = fixtures();
        let compiler = ExpressionCompiler::new(&vocab, &aliases);

        assert!(compiler.compile(&json!(["location"])).is_err());
        let errors = compiler.compile(&json!({ "and": { "gene": {} } })).unwrap_err();
        assert_eq!(errors.messages(), vec!["query.and must be an array of a component"]);
    }

    #[test]
    fn gene_ids_skip_negated_filters() {
        let (vocab, aliases) = fixtures();
        let compiler = ExpressionCompiler::new(&vocab, &aliases);

        let expression = compiler
            .parse(&json!({
                "or": [
                    { "gene": { "terms": [1100, 404] } },
                    { "gene": { "relation": "ne", "terms": [7] } },
                    { "and": [{ "gene": { "terms": [404, 12] } }] }
                ]
            }))
            .unwrap()
            .unwrap();
        assert_eq!(expression.gene_ids(), vec![1100, 404, 12]);
    }

    #[test]
    fn empty_children_are_dropped() {
        let (vocab, aliases) = fixtures();
        let compiler = ExpressionCompiler::new(&vocab, &aliases);

        assert_eq!(compiler.compile(&json!({ "and": [{}, {}] })).unwrap(), None);

        let single = compiler
            .compile(&json!({ "and": [{}, { "location": { "chromosome": "2" } }] }))
            .unwrap()
            .unwrap();
        assert_eq!(
            single,
            Clause::and(vec![Clause::term("chromosome.label", "2")])
        );
    }
}
