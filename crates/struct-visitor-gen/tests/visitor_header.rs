use pretty_assertions::assert_eq;
use rstest::rstest;
use struct_visitor_gen::expand::{ExpandError, Preprocessor};
use struct_visitor_gen::{CodeGenConfig, DispatchTable, GenError, LintStyle, MaxArity, Preset};

const GLUE: &str = "\
#define STRUCT_VISITABLE_START(S, N) start(S, N)
#define STRUCT_VISITABLE_FIELD_NAMES(...) names(__VA_ARGS__)
#define STRUCT_VISITABLE_FIELD_VALUES(...) values(__VA_ARGS__)
#define STRUCT_VISITABLE_END(S) end(S)
";

fn config(max: usize) -> CodeGenConfig {
    CodeGenConfig::new().max_arity(MaxArity::try_from(max).unwrap())
}

fn dispatch(config: &CodeGenConfig) -> DispatchTable<'_> {
    config.context().unwrap().dispatch_table()
}

fn with_glue(config: &CodeGenConfig) -> Preprocessor {
    let mut pp = config.preprocessor().unwrap();
    pp.load(GLUE).unwrap();
    pp
}

fn fields(count: usize) -> Vec<String> {
    (1..=count).map(|idx| format!("f{idx}")).collect()
}

fn call(ty: &str, fields: &[String]) -> String {
    let mut call = format!("STRUCT_VISITABLE({ty}");
    for field in fields {
        call.push_str(", ");
        call.push_str(field);
    }
    call.push(')');
    call
}

fn expected(ty: &str, fields: &[String], receiver: &str) -> String {
    let names = fields
        .iter()
        .map(|f| format!("\"{f}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let values = fields
        .iter()
        .map(|f| format!("{receiver}.{f}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "start({ty}, {}) names({names}) values({values}) end({ty})",
        fields.len()
    )
}

/// Pulls `(NAME, [names...], [values...])` out of each arity macro definition in a header.
fn arity_blocks(header: &str) -> Vec<(String, Vec<String>, Vec<String>)> {
    let list = |line: &str| -> Vec<String> {
        let inner = line
            .split_once('(')
            .and_then(|(_, rest)| rest.rsplit_once(')'))
            .map(|(inner, _)| inner)
            .unwrap();
        inner.split(", ").map(str::to_owned).collect()
    };

    let lines = header.lines().map(str::trim).collect::<Vec<_>>();
    lines
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| {
            let name = line.strip_prefix("#define ")?.split('(').next()?;
            let arity = name.strip_prefix("STRUCT_VISITABLE")?;
            if arity.is_empty() || !arity.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            Some((name.to_owned(), list(lines[idx + 2]), list(lines[idx + 3])))
        })
        .collect()
}

#[test]
fn point_scenario() {
    let config = CodeGenConfig::new();
    let pp = with_glue(&config);

    let expansion = pp.expand("STRUCT_VISITABLE(Point, x, y, z)").unwrap();
    assert_eq!(
        expansion.to_string(),
        r#"start(Point, 3) names("x", "y", "z") values(s.x, s.y, s.z) end(Point)"#
    );
    expansion.check_dispatch(&dispatch(&config)).unwrap();
}

#[test]
fn single_field_scenario() {
    let config = CodeGenConfig::new();
    let pp = with_glue(&config);

    assert_eq!(
        pp.expand("STRUCT_VISITABLE(Id, id)").unwrap().to_string(),
        r#"start(Id, 1) names("id") values(s.id) end(Id)"#
    );
}

#[test]
fn every_arity_lines_up_names_and_values() {
    let header = CodeGenConfig::new().render().unwrap();
    let blocks = arity_blocks(&header);
    assert_eq!(blocks.len(), 64);

    for (offset, (name, names, values)) in blocks.iter().enumerate() {
        let arity = 64 - offset;
        assert_eq!(name, &format!("STRUCT_VISITABLE{arity}"));
        assert_eq!(names.len(), arity, "{name}");
        assert_eq!(values.len(), arity, "{name}");

        for (idx, (field_name, value)) in names.iter().zip(values).enumerate() {
            assert_eq!(field_name, &format!("#F{}", idx + 1));
            assert_eq!(value, &format!("s.F{}", idx + 1));
        }
    }
}

#[rstest]
#[case::default(CodeGenConfig::new(), 64)]
#[case::klocwork(CodeGenConfig::from_preset(Preset::Max50), 50)]
#[case::small(config(3), 3)]
fn dispatch_lands_on_matching_arity(#[case] config: CodeGenConfig, #[case] max: usize) {
    let pp = with_glue(&config);

    for count in 1..=max {
        let fields = fields(count);
        let expansion = pp.expand(&call("T", &fields)).unwrap();
        assert_eq!(expansion.to_string(), expected("T", &fields, "s"));
        expansion.check_dispatch(&dispatch(&config)).unwrap();
    }
}

#[test]
fn dispatch_without_glue_reaches_glue_calls() {
    let config = config(5);
    let pp = config.preprocessor().unwrap();

    let expansion = pp.expand("STRUCT_VISITABLE(Pair, a, b)").unwrap();
    assert_eq!(
        expansion.calls().collect::<Vec<_>>(),
        vec![
            "STRUCT_VISITABLE_START",
            "STRUCT_VISITABLE_FIELD_NAMES",
            "STRUCT_VISITABLE_FIELD_VALUES",
            "STRUCT_VISITABLE_END"
        ]
    );
    expansion.check_dispatch(&dispatch(&config)).unwrap();
}

#[test]
fn zero_fields_count_as_zero() {
    let config = config(4);
    let pp = config.preprocessor().unwrap();

    assert_eq!(
        pp.expand("STRUCT_VISITABLE_NARG()").unwrap().to_string(),
        "0"
    );
    assert_eq!(
        pp.expand("STRUCT_VISITABLE_NARG(a, b)").unwrap().to_string(),
        "2"
    );

    let expansion = pp.expand("STRUCT_VISITABLE(Empty)").unwrap();
    assert_eq!(expansion.to_string(), "STRUCT_VISITABLE0(Empty)");
    assert_eq!(
        expansion.check_dispatch(&dispatch(&config)),
        Err(ExpandError::UnresolvedDispatch {
            call: "STRUCT_VISITABLE0".to_owned()
        })
    );
}

#[rstest]
#[case(3)]
#[case(50)]
fn more_fields_than_max_do_not_resolve(#[case] max: usize) {
    let config = config(max);
    let pp = with_glue(&config);

    let fields = fields(max + 1);
    let expansion = pp.expand(&call("Big", &fields)).unwrap();
    assert_eq!(
        expansion.check_dispatch(&dispatch(&config)),
        Err(ExpandError::UnresolvedDispatch {
            call: format!("STRUCT_VISITABLE{}", max + 1)
        })
    );
}

/// The overflowing field is pasted onto the prefix. When that forms a helper or glue name the
/// expansion goes through without an undefined arity macro, so only the field count catches it.
#[rstest]
#[case::narg("_NARG", "c")]
#[case::arg_n("_ARG_N", "c")]
#[case::start("_START", "STRUCT_VISITABLE_START(Big, a, b, c, _START)")]
#[case::field_names("_FIELD_NAMES", "STRUCT_VISITABLE_FIELD_NAMES(Big, a, b, c, _FIELD_NAMES)")]
#[case::end("_END", "STRUCT_VISITABLE_END(Big, a, b, c, _END)")]
fn overflow_onto_existing_macro_is_caught(#[case] last: &str, #[case] expanded: &str) {
    let config = config(3);
    let pp = config.preprocessor().unwrap();

    let expansion = pp
        .expand(&format!("STRUCT_VISITABLE(Big, a, b, c, {last})"))
        .unwrap();
    assert_eq!(expansion.to_string(), expanded);
    assert_eq!(
        expansion.check_dispatch(&dispatch(&config)),
        Err(ExpandError::UnresolvedDispatch {
            call: "STRUCT_VISITABLE4".to_owned()
        })
    );
}

#[test]
fn every_entry_call_is_counted() {
    let config = config(2);
    let pp = with_glue(&config);

    let expansion = pp
        .expand("STRUCT_VISITABLE(A, x) STRUCT_VISITABLE(B, x, y, z)")
        .unwrap();
    assert_eq!(
        expansion.check_dispatch(&dispatch(&config)),
        Err(ExpandError::UnresolvedDispatch {
            call: "STRUCT_VISITABLE3".to_owned()
        })
    );
}

#[test]
fn custom_receiver_and_prefix() {
    let config = config(4).prefix("VISIT").receiver("self_");
    let mut pp = config.preprocessor().unwrap();
    pp.load(&GLUE.replace("STRUCT_VISITABLE", "VISIT")).unwrap();

    let expansion = pp.expand("VISIT(Point, x, y)").unwrap();
    assert_eq!(
        expansion.to_string(),
        r#"start(Point, 2) names("x", "y") values(self_.x, self_.y) end(Point)"#
    );
    expansion.check_dispatch(&dispatch(&config)).unwrap();
}

#[test]
fn regenerating_is_byte_identical() {
    let config = CodeGenConfig::from_preset(Preset::Max64).include_guard("VISITOR_GENERATED_H");
    assert_eq!(config.render().unwrap(), config.render().unwrap());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("visitor_generated.h");

    config.clone().output_file(&path).generate().unwrap();
    let first = std::fs::read(&path).unwrap();
    config.clone().output_file(&path).generate().unwrap();
    let second = std::fs::read(&path).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, config.render().unwrap().into_bytes());
}

#[test]
fn header_layout() {
    let header = config(2).include_guard("VISITOR_H").render().unwrap();

    assert!(header.starts_with("// @generated by struct-visitor-gen, do not edit.\n"));
    assert!(header.contains("#ifndef VISITOR_H\n#define VISITOR_H\n"));
    assert!(header.trim_end().ends_with("#endif  // VISITOR_H"));

    let defines = header
        .lines()
        .filter_map(|line| line.strip_prefix("#define "))
        .filter_map(|line| line.split(['(', ' ']).next())
        .collect::<Vec<_>>();
    assert_eq!(
        defines,
        vec![
            "VISITOR_H",
            "STRUCT_VISITABLE2",
            "STRUCT_VISITABLE1",
            "STRUCT_VISITABLE_ARG_N",
            "STRUCT_VISITABLE_NARG",
            "STRUCT_VISITABLE_CONCAT",
            "STRUCT_VISITABLE_CONCAT_IMPL",
            "STRUCT_VISITABLE",
        ]
    );
}

#[rstest]
#[case::plain(LintStyle::Plain, None)]
#[case::coverity(LintStyle::Coverity, Some("// coverity[autosar_cpp14_a16_0_1_violation]"))]
#[case::klocwork(LintStyle::Klocwork, Some("KW_SUPPRESS_START:MISRA.DEFINE.FUNC"))]
fn lint_annotations(#[case] lint: LintStyle, #[case] marker: Option<&str>) {
    let config = config(2).lint_style(lint);
    let header = config.render().unwrap();

    match marker {
        Some(marker) => assert!(header.contains(marker), "{header}"),
        None => {
            assert!(!header.contains("coverity"));
            assert!(!header.contains("KW_SUPPRESS"));
        }
    }

    // annotations are comments, expansion is unaffected
    let pp = with_glue(&config);
    assert_eq!(
        pp.expand("STRUCT_VISITABLE(P, a)").unwrap().to_string(),
        r#"start(P, 1) names("a") values(s.a) end(P)"#
    );
}

#[rstest]
#[case(0)]
#[case(-3)]
#[case(128)]
fn out_of_range_max_is_rejected(#[case] max: i64) {
    assert!(MaxArity::try_from(max).is_err());
}

#[test]
fn zero_max_reports_the_value() {
    assert!(matches!(
        MaxArity::try_from(0_i64),
        Err(GenError::InvalidMaxArity(0))
    ));
}

#[test]
fn limit_is_accepted() {
    let config = config(MaxArity::LIMIT);
    let pp = with_glue(&config);
    let fields = fields(MaxArity::LIMIT);
    assert_eq!(
        pp.expand(&call("Wide", &fields)).unwrap().to_string(),
        expected("Wide", &fields, "s")
    );
}
