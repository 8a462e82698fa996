//! Text template engine: compile once, execute against a JSON context

use serde_json::Value;

use super::helpers::{self, Helper};
use super::{RenderError, TemplateResult};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Clone, Debug)]
enum Node {
    Text(String),
    Value(Expr),
    If {
        condition: Vec<String>,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

#[derive(Clone, Debug)]
struct Expr {
    path: Vec<String>,
    helpers: Vec<Helper>,
}

/// `{{#if}}` block still waiting for its `{{/if}}`
struct OpenBlock {
    condition: Vec<String>,
    then: Vec<Node>,
    otherwise: Option<Vec<Node>>,
}

enum Tag<'a> {
    If(&'a str),
    Else,
    EndIf,
    Value(&'a str),
}

/// A parsed template, ready to be executed any number of times
#[derive(Clone, Debug)]
pub struct CompiledTemplate {
    nodes: Vec<Node>,
}

impl CompiledTemplate {
    pub fn compile(source: &str) -> TemplateResult<Self> {
        let mut root = Vec::new();
        let mut blocks: Vec<OpenBlock> = Vec::new();
        let mut rest = source;

        while let Some(start) = rest.find(OPEN) {
            if start > 0 {
                target(&mut root, &mut blocks).push(Node::Text(rest[..start].to_string()));
            }

            let after_open = &rest[start + OPEN.len()..];
            let end = after_open.find(CLOSE).ok_or_else(|| {
                RenderError::Syntax(format!(
                    "unclosed tag at byte {}",
                    source.len() - rest.len() + start
                ))
            })?;

            match classify(after_open[..end].trim()) {
                Tag::If(condition) => blocks.push(OpenBlock {
                    condition: parse_path(condition)?,
                    then: Vec::new(),
                    otherwise: None,
                }),
                Tag::Else => match blocks.last_mut() {
                    Some(block) if block.otherwise.is_none() => block.otherwise = Some(Vec::new()),
                    Some(_) => return Err(RenderError::Syntax("duplicate {{else}}".to_string())),
                    None => {
                        return Err(RenderError::Syntax("{{else}} outside of {{#if}}".to_string()))
                    }
                },
                Tag::EndIf => {
                    let block = blocks.pop().ok_or_else(|| {
                        RenderError::Syntax("{{/if}} without matching {{#if}}".to_string())
                    })?;
                    target(&mut root, &mut blocks).push(Node::If {
                        condition: block.condition,
                        then: block.then,
                        otherwise: block.otherwise.unwrap_or_default(),
                    });
                }
                Tag::Value(expr) => {
                    let expr = parse_expr(expr)?;
                    target(&mut root, &mut blocks).push(Node::Value(expr));
                }
            }

            rest = &after_open[end + CLOSE.len()..];
        }

        if !rest.is_empty() {
            target(&mut root, &mut blocks).push(Node::Text(rest.to_string()));
        }

        if let Some(block) = blocks.last() {
            return Err(RenderError::Syntax(format!(
                "unclosed {{{{#if {}}}}}",
                block.condition.join(".")
            )));
        }

        Ok(Self { nodes: root })
    }

    /// Execute the template against `context`
    pub fn execute(&self, context: &Value) -> TemplateResult<String> {
        let mut out = String::new();
        render_nodes(&self.nodes, context, &mut out)?;
        Ok(out)
    }
}

fn target<'a>(root: &'a mut Vec<Node>, blocks: &'a mut [OpenBlock]) -> &'a mut Vec<Node> {
    match blocks.last_mut() {
        Some(block) => match &mut block.otherwise {
            Some(otherwise) => otherwise,
            None => &mut block.then,
        },
        None => root,
    }
}

fn classify(tag: &str) -> Tag<'_> {
    if let Some(condition) = tag.strip_prefix("#if") {
        return Tag::If(condition.trim());
    }
    match tag {
        "else" => Tag::Else,
        "/if" => Tag::EndIf,
        _ => Tag::Value(tag),
    }
}

fn parse_path(raw: &str) -> TemplateResult<Vec<String>> {
    if raw.is_empty() || raw.chars().any(char::is_whitespace) {
        return Err(RenderError::Syntax(format!("invalid path '{}'", raw)));
    }

    let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
    if segments.iter().any(String::is_empty) {
        return Err(RenderError::Syntax(format!("invalid path '{}'", raw)));
    }
    Ok(segments)
}

fn parse_expr(raw: &str) -> TemplateResult<Expr> {
    let mut parts = raw.split('|').map(str::trim);
    let path = parse_path(parts.next().unwrap_or_default())?;

    let helpers = parts
        .map(|name| {
            helpers::lookup(name)
                .ok_or_else(|| RenderError::Syntax(format!("unknown helper '{}'", name)))
        })
        .collect::<TemplateResult<Vec<_>>>()?;

    Ok(Expr { path, helpers })
}

fn render_nodes(nodes: &[Node], context: &Value, out: &mut String) -> TemplateResult<()> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Value(expr) => {
                let value = resolve(context, &expr.path)?;
                let text = expr
                    .helpers
                    .iter()
                    .fold(stringify(value), |acc, helper| helper(&acc));
                out.push_str(&text);
            }
            Node::If {
                condition,
                then,
                otherwise,
            } => {
                let branch = if is_truthy(resolve(context, condition)?) {
                    then
                } else {
                    otherwise
                };
                render_nodes(branch, context, out)?;
            }
        }
    }
    Ok(())
}

fn resolve<'a>(context: &'a Value, path: &[String]) -> TemplateResult<&'a Value> {
    path.iter()
        .try_fold(context, |value, segment| value.get(segment.as_str()))
        .ok_or_else(|| RenderError::Execution(format!("missing field '{}'", path.join("."))))
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        // Numbers, booleans, arrays and objects use their JSON form
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
