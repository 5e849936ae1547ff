// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The TQL parser (C4): turns pipeline source text into an ordered list of
//! [`OperatorUserConfig`] values, one per `|`-separated stage. Each operator's own argument
//! parser (§6.1) is responsible for interpreting its `config` value; this parser only
//! recognizes the shared positional/named-argument shape.

use crate::error::Error;
use pest::Parser;
use pest_derive::Parser as PestParser;
use serde_json::{Map, Value};
use tql_df_config::OperatorUserConfig;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct TqlParser;

/// Parses a full pipeline string (`op1(args) | op2(args) | ...`) into its operator
/// definitions, in source order.
pub fn parse_pipeline(source: &str) -> Result<Vec<OperatorUserConfig>, Error> {
    let mut pairs = TqlParser::parse(Rule::pipeline, source).map_err(|err| Error::ParseError(err.to_string()))?;
    let pipeline = pairs.next().ok_or_else(|| Error::ParseError("empty input".to_string()))?;

    let mut operators = Vec::new();
    for stage in pipeline.into_inner() {
        match stage.as_rule() {
            Rule::operator_call => operators.push(parse_operator_call(stage)?),
            Rule::EOI => {}
            other => return Err(Error::ParseError(format!("unexpected top-level rule {other:?}"))),
        }
    }
    if operators.is_empty() {
        return Err(Error::EmptyPipeline);
    }
    Ok(operators)
}

fn parse_operator_call(pair: pest::iterators::Pair<'_, Rule>) -> Result<OperatorUserConfig, Error> {
    let mut inner = pair.into_inner();
    let name = inner.next().ok_or_else(|| Error::ParseError("operator call missing name".to_string()))?.as_str();

    let mut positional = Vec::new();
    let mut named = Map::new();
    if let Some(arg_list) = inner.next() {
        for argument in arg_list.into_inner() {
            let arg = argument.into_inner().next().ok_or_else(|| Error::ParseError("empty argument".to_string()))?;
            match arg.as_rule() {
                Rule::named_argument => {
                    let mut parts = arg.into_inner();
                    let key = parts.next().expect("named_argument has a key").as_str().to_string();
                    let literal = parts.next().expect("named_argument has a value");
                    let _ = named.insert(key, parse_literal(literal));
                }
                Rule::positional_argument => {
                    let literal = arg.into_inner().next().expect("positional_argument has a value");
                    positional.push(parse_literal(literal));
                }
                other => return Err(Error::ParseError(format!("unexpected argument rule {other:?}"))),
            }
        }
    }

    let mut config = Map::new();
    let _ = config.insert("args".to_string(), Value::Array(positional));
    let _ = config.insert("kwargs".to_string(), Value::Object(named));

    let urn = tql_df_config::OperatorUrn::new(name.to_string())
        .map_err(|err| Error::ParseError(format!("invalid operator name `{name}`: {err}")))?;
    Ok(OperatorUserConfig::with_config(urn, Value::Object(config)))
}

fn parse_literal(pair: pest::iterators::Pair<'_, Rule>) -> Value {
    let literal = pair.into_inner().next().unwrap_or(pair);
    match literal.as_rule() {
        Rule::string => Value::String(unescape(literal.into_inner().next().map_or("", |p| p.as_str()))),
        Rule::number => literal
            .as_str()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| literal.as_str().parse::<f64>().map(Value::from).unwrap_or(Value::Null)),
        Rule::boolean => Value::Bool(literal.as_str() == "true"),
        Rule::raw_expr | Rule::ident => Value::String(literal.as_str().trim().to_string()),
        _ => Value::String(literal.as_str().to_string()),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_operator_with_no_args() {
        let ops = parse_pipeline("metrics").unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].name(), "metrics");
    }

    #[test]
    fn parses_chain_with_positional_and_named_args() {
        let ops = parse_pipeline(r#"head 3 | where x > 1 | select a, b=int(x)"#).unwrap();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].name(), "head");
        assert_eq!(ops[0].config["args"][0], Value::from(3));
        assert_eq!(ops[1].name(), "where");
        assert_eq!(ops[2].name(), "select");
    }

    #[test]
    fn parses_quoted_string_arguments() {
        let ops = parse_pipeline(r#"from "hello world""#).unwrap();
        assert_eq!(ops[0].config["args"][0], Value::String("hello world".to_string()));
    }

    #[test]
    fn rejects_empty_pipeline() {
        assert!(matches!(parse_pipeline("   "), Err(Error::ParseError(_)) | Err(Error::EmptyPipeline)));
    }
}
