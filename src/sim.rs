//! In-memory stand-in for `ghoul::Dictionary` that decodes by the same rules
//! the emitted `bakeTo` overloads follow.
use indexmap::IndexMap;

use crate::emit::decode::{stored_glm_type, variant_order, Predicate};
use crate::ir::{BasicKind, NumericKind, Shape, StructId, Unit};

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Bool(bool),
    Number(f64),
    Str(String),
    /// Stored glm type (`glm::dvec3`) and its components.
    Glm(String, Vec<f64>),
    Table(Dict),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict(pub IndexMap<String, Entry>);

impl Dict {
    pub fn new(entries: impl IntoIterator<Item = (&'static str, Entry)>) -> Self {
        Dict(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    /// Keys `"1".."N"` in order.
    pub fn sequence(entries: impl IntoIterator<Item = Entry>) -> Self {
        Dict(entries.into_iter().enumerate().map(|(i, v)| ((i + 1).to_string(), v)).collect())
    }

    fn get(&self, key: &str) -> Result<&Entry, DecodeError> {
        self.0.get(key).ok_or_else(|| DecodeError::MissingKey(key.to_string()))
    }

    fn table(&self, key: &str) -> Result<&Dict, DecodeError> {
        match self.get(key)? {
            Entry::Table(dict) => Ok(dict),
            _ => Err(DecodeError::WrongType(key.to_string())),
        }
    }

    fn is_sequence(&self) -> bool {
        (1..=self.0.len()).all(|i| self.0.contains_key(&i.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Float(f32),
    Double(f64),
    Str(String),
    Glm(Vec<f64>),
    Dict(Dict),
    Absent,
    Present(Box<Value>),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    /// Index of the chosen variant alternative.
    Alt(usize, Box<Value>),
    Tuple(Vec<Value>),
    /// Enumerator name; `None` when no key matched and the target is left untouched.
    Enum(Option<String>),
    Struct(Vec<(String, Value)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    MissingKey(String),
    WrongType(String),
    SizeMismatch { key: String, expected: usize, found: usize },
    MissingCase(String),
}

fn matches(predicate: &Predicate, entry: &Entry) -> bool {
    match (predicate, entry) {
        (Predicate::Bool, Entry::Bool(_)) => true,
        (Predicate::Number, Entry::Number(_)) => true,
        (Predicate::String, Entry::Str(_)) => true,
        (Predicate::Glm(expected), Entry::Glm(stored, _)) => expected == stored,
        (Predicate::Sequence, Entry::Table(dict)) => dict.is_sequence(),
        (Predicate::Table, Entry::Table(_)) => true,
        (Predicate::Any(all), entry) => all.iter().any(|p| matches(p, entry)),
        _ => false,
    }
}

fn elements(unit: &Unit, dict: &Dict, key: &str, inner: &Shape, expected: Option<usize>) -> Result<Vec<Value>, DecodeError> {
    let sub = dict.table(key)?;
    if let Some(expected) = expected {
        if sub.0.len() != expected {
            return Err(DecodeError::SizeMismatch { key: key.to_string(), expected, found: sub.0.len() });
        }
    }
    (1..=sub.0.len())
        .map(|i| {
            let k = i.to_string();
            if !sub.0.contains_key(&k) {
                return Err(DecodeError::MissingKey(k));
            }
            decode(unit, sub, &k, inner)
        })
        .collect()
}

pub fn decode(unit: &Unit, dict: &Dict, key: &str, shape: &Shape) -> Result<Value, DecodeError> {
    let wrong = || DecodeError::WrongType(key.to_string());
    match shape {
        Shape::Basic { kind } => match (kind, dict.get(key)?) {
            (BasicKind::Bool, Entry::Bool(b)) => Ok(Value::Bool(*b)),
            (BasicKind::Int, Entry::Number(n)) => Ok(Value::Int(*n as i32)),
            (BasicKind::Float, Entry::Number(n)) => Ok(Value::Float(*n as f32)),
            (BasicKind::Double, Entry::Number(n)) => Ok(Value::Double(*n)),
            (BasicKind::String | BasicKind::Path, Entry::Str(s)) => Ok(Value::Str(s.clone())),
            (BasicKind::Dictionary, Entry::Table(d)) => Ok(Value::Dict(d.clone())),
            _ => Err(wrong()),
        },
        Shape::FixedVector { element, .. } | Shape::FixedMatrix { element, .. } => match dict.get(key)? {
            Entry::Glm(stored, values) if Some(stored) == stored_glm_type(shape).as_ref() => {
                Ok(Value::Glm(
                    values
                        .iter()
                        .map(|v| match element {
                            NumericKind::Int => (*v as i32) as f64,
                            NumericKind::Float => (*v as f32) as f64,
                            NumericKind::Double => *v,
                        })
                        .collect(),
                ))
            }
            _ => Err(wrong()),
        },
        Shape::Optional { inner } => {
            if dict.0.contains_key(key) {
                Ok(Value::Present(Box::new(decode(unit, dict, key, inner)?)))
            } else {
                Ok(Value::Absent)
            }
        }
        Shape::Vector { inner } => Ok(Value::List(elements(unit, dict, key, inner, None)?)),
        Shape::Array { inner, size } => Ok(Value::List(elements(unit, dict, key, inner, Some(*size))?)),
        Shape::Map { value } => {
            let sub = dict.table(key)?;
            let mut out = IndexMap::new();
            for k in sub.0.keys() {
                out.insert(k.clone(), decode(unit, sub, k, value)?);
            }
            Ok(Value::Map(out))
        }
        Shape::Variant { alternatives } => {
            let entry = dict.get(key)?;
            for (index, predicate) in variant_order(alternatives) {
                if matches(&predicate, entry) {
                    let value = decode(unit, dict, key, &alternatives[index])?;
                    return Ok(Value::Alt(index, Box::new(value)));
                }
            }
            Err(DecodeError::MissingCase(key.to_string()))
        }
        Shape::Tuple { elements } => {
            let sub = dict.table(key)?;
            elements
                .iter()
                .enumerate()
                .map(|(i, e)| decode(unit, sub, &(i + 1).to_string(), e))
                .collect::<Result<_, _>>()
                .map(Value::Tuple)
        }
        Shape::Enum { target } => match dict.get(key)? {
            Entry::Str(s) => Ok(Value::Enum(
                target.values.iter().find(|v| &v.key == s).map(|v| v.name.clone()),
            )),
            _ => Err(wrong()),
        },
        Shape::Struct { target } => bake_members(unit, dict.table(key)?, target.id),
        Shape::Pointer { .. } => Err(wrong()),
    }
}

fn bake_members(unit: &Unit, dict: &Dict, id: StructId) -> Result<Value, DecodeError> {
    unit.get(id)
        .variables
        .iter()
        .map(|v| Ok::<_, DecodeError>((v.name.clone(), decode(unit, dict, &v.key, &v.shape)?)))
        .collect::<Result<_, _>>()
        .map(Value::Struct)
}

/// `bake<S>` minus the verifier pass.
pub fn bake(unit: &Unit, id: StructId, dict: &Dict) -> Result<Value, DecodeError> {
    bake_members(unit, dict, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze;
    use crate::schema::struct_schema;
    use crate::source::SourceFile;
    use pretty_assertions::assert_eq;

    fn unit(text: &str) -> Unit {
        analyze(&SourceFile::new("t.cpp", text)).unwrap()
    }

    fn text(s: &str) -> Entry {
        Entry::Str(s.to_string())
    }

    fn member(unit: &Unit, index: usize) -> &Shape {
        &unit.get(unit.roots[0]).variables[index].shape
    }

    #[test]
    fn loose_numbers_decode_into_the_declared_members() {
        let unit = unit(
            "struct [[codegen::Dictionary(Test)]] Parameters {\n\
             bool boolValue;\n\
             int intValue;\n\
             std::optional<std::variant<bool, int>> optionalValue;\n\
             };",
        );
        let dict = Dict::new([
            ("BoolValue", Entry::Bool(true)),
            ("IntValue", Entry::Number(7.0)),
            ("OptionalValue", Entry::Number(9.0)),
        ]);
        assert_eq!(
            bake(&unit, unit.roots[0], &dict).unwrap(),
            Value::Struct(vec![
                ("boolValue".into(), Value::Bool(true)),
                ("intValue".into(), Value::Int(7)),
                ("optionalValue".into(), Value::Present(Box::new(Value::Alt(1, Box::new(Value::Int(9)))))),
            ])
        );

        let schema = struct_schema(&unit, unit.roots[0]);
        let summary: Vec<(String, String, bool)> = schema
            .entries
            .iter()
            .map(|e| (e.key.clone(), e.verifier.type_name(), e.optional))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("BoolValue".into(), "Boolean".into(), false),
                ("IntValue".into(), "Integer".into(), false),
                ("OptionalValue".into(), "Boolean, or Integer".into(), true),
            ]
        );
    }

    #[test]
    fn absent_optionals_stay_empty() {
        let unit = unit("struct [[codegen::Dictionary(T)]] P { std::optional<double> scale; };");
        let value = bake(&unit, unit.roots[0], &Dict::default()).unwrap();
        assert_eq!(value, Value::Struct(vec![("scale".into(), Value::Absent)]));
    }

    #[test]
    fn sequences_must_not_have_gaps() {
        let unit = unit("struct [[codegen::Dictionary(T)]] P { std::vector<std::string> names; };");
        let full = Dict::new([("Names", Entry::Table(Dict::sequence([text("a"), text("b"), text("c")])))]);
        assert_eq!(
            bake(&unit, unit.roots[0], &full).unwrap(),
            Value::Struct(vec![(
                "names".into(),
                Value::List(vec![Value::Str("a".into()), Value::Str("b".into()), Value::Str("c".into())])
            )])
        );

        let gap = Dict::new([("Names", Entry::Table(Dict::new([("1", text("a")), ("3", text("c"))])))]);
        assert_eq!(bake(&unit, unit.roots[0], &gap), Err(DecodeError::MissingKey("2".into())));
    }

    #[test]
    fn arrays_need_the_exact_size() {
        let unit = unit("struct [[codegen::Dictionary(T)]] P { std::array<int, 3> xs; };");
        let shape = member(&unit, 0);
        let three = Dict::new([("Xs", Entry::Table(Dict::sequence([1.0, 2.0, 3.9].map(Entry::Number))))]);
        assert_eq!(
            decode(&unit, &three, "Xs", shape).unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        let two = Dict::new([("Xs", Entry::Table(Dict::sequence([1.0, 2.0].map(Entry::Number))))]);
        assert_eq!(
            decode(&unit, &two, "Xs", shape),
            Err(DecodeError::SizeMismatch { key: "Xs".into(), expected: 3, found: 2 })
        );
    }

    #[test]
    fn variant_resolution_ignores_declaration_order() {
        let forward = unit(
            "struct [[codegen::Dictionary(T)]] P { std::variant<std::string, std::vector<std::string>> v; };",
        );
        let backward = unit(
            "struct [[codegen::Dictionary(T)]] P { std::variant<std::vector<std::string>, std::string> v; };",
        );
        let scalar = Dict::new([("V", text("x"))]);
        let list = Dict::new([("V", Entry::Table(Dict::sequence([text("x")])))]);
        let chosen = |unit: &Unit, dict: &Dict| match decode(unit, dict, "V", member(unit, 0)).unwrap() {
            Value::Alt(index, value) => (index, *value),
            other => panic!("unexpected {other:?}"),
        };

        assert_eq!(chosen(&forward, &scalar), (0, Value::Str("x".into())));
        assert_eq!(chosen(&backward, &scalar), (1, Value::Str("x".into())));
        assert_eq!(chosen(&forward, &list), (1, Value::List(vec![Value::Str("x".into())])));
        assert_eq!(chosen(&backward, &list), (0, Value::List(vec![Value::Str("x".into())])));

        let neither = Dict::new([("V", Entry::Bool(true))]);
        assert_eq!(
            decode(&forward, &neither, "V", member(&forward, 0)),
            Err(DecodeError::MissingCase("V".into()))
        );
    }

    #[test]
    fn sequences_win_over_maps_in_either_order() {
        let unit = unit(
            "struct [[codegen::Dictionary(T)]] P { std::variant<std::map<std::string, int>, std::vector<int>> v; };",
        );
        let list = Dict::new([("V", Entry::Table(Dict::sequence([Entry::Number(4.0)])))]);
        let map = Dict::new([("V", Entry::Table(Dict::new([("a", Entry::Number(4.0))])))]);
        assert!(matches!(decode(&unit, &list, "V", member(&unit, 0)), Ok(Value::Alt(1, _))));
        assert!(matches!(decode(&unit, &map, "V", member(&unit, 0)), Ok(Value::Alt(0, _))));
    }

    #[test]
    fn nested_members_are_read_inside_their_own_table() {
        let unit = unit(
            "struct [[codegen::Dictionary(T)]] D { struct Inner { int var; }; Inner inner; };",
        );
        let nested = Dict::new([("Inner", Entry::Table(Dict::new([("Var", Entry::Number(3.0))])))]);
        assert_eq!(
            bake(&unit, unit.roots[0], &nested).unwrap(),
            Value::Struct(vec![("inner".into(), Value::Struct(vec![("var".into(), Value::Int(3))]))])
        );
        let flattened = Dict::new([("InnerVar", Entry::Number(3.0))]);
        assert_eq!(bake(&unit, unit.roots[0], &flattened), Err(DecodeError::MissingKey("Inner".into())));
    }

    #[test]
    fn glm_values_convert_from_double_storage() {
        let unit = unit("struct [[codegen::Dictionary(T)]] P { glm::ivec2 cells; glm::vec2 size; glm::dvec2 exact; };");
        let stored = |v: Vec<f64>| Entry::Glm("glm::dvec2".into(), v);
        let dict = Dict::new([
            ("Cells", stored(vec![1.7, -2.2])),
            ("Size", stored(vec![0.1, 0.5])),
            ("Exact", stored(vec![0.1, 0.5])),
        ]);
        assert_eq!(
            bake(&unit, unit.roots[0], &dict).unwrap(),
            Value::Struct(vec![
                ("cells".into(), Value::Glm(vec![1.0, -2.0])),
                ("size".into(), Value::Glm(vec![0.1f32 as f64, 0.5])),
                ("exact".into(), Value::Glm(vec![0.1, 0.5])),
            ])
        );
        let wrong = Dict::new([("Cells", Entry::Glm("glm::dvec3".into(), vec![0.0; 3]))]);
        assert_eq!(decode(&unit, &wrong, "Cells", member(&unit, 0)), Err(DecodeError::WrongType("Cells".into())));
    }

    #[test]
    fn maps_tuples_and_enums() {
        let unit = unit(
            "struct [[codegen::Dictionary(T)]] P {\n\
             enum class Mode { Fast, Slow [[codegen::key(\"slow\")]] };\n\
             std::map<std::string, float> weights;\n\
             std::tuple<int, std::string> pair;\n\
             Mode mode;\n\
             };",
        );
        let dict = Dict::new([
            ("Weights", Entry::Table(Dict::new([("b", Entry::Number(2.0)), ("a", Entry::Number(0.5))]))),
            ("Pair", Entry::Table(Dict::sequence([Entry::Number(4.0), text("four")]))),
            ("Mode", text("slow")),
        ]);
        let value = bake(&unit, unit.roots[0], &dict).unwrap();
        let Value::Struct(members) = value else { panic!("not a struct") };
        assert_eq!(
            members[0].1,
            Value::Map(IndexMap::from([("b".into(), Value::Float(2.0)), ("a".into(), Value::Float(0.5))]))
        );
        assert_eq!(members[1].1, Value::Tuple(vec![Value::Int(4), Value::Str("four".into())]));
        assert_eq!(members[2].1, Value::Enum(Some("Slow".into())));

        let unmatched = Dict::new([("Mode", text("Slow"))]);
        assert_eq!(decode(&unit, &unmatched, "Mode", member(&unit, 2)).unwrap(), Value::Enum(None));
    }
}
