use casework::{
    CollisionPolicy, FixtureError, IdStyleName, Parametrize, TestFunction, fixture_union,
    generate_calls,
};
use pretty_assertions::assert_eq;

use crate::common::{TestContext, constant, ids};

#[test]
fn defaults_without_a_configuration_file() -> anyhow::Result<()> {
    let context = TestContext::new();

    let project = context.project()?;

    assert_eq!(project.config_path(), None);
    assert_eq!(project.root(), context.root());
    assert_eq!(project.settings().ids().union_style, IdStyleName::Compact);
    assert_eq!(project.settings().ids().param_style, IdStyleName::None);
    assert_eq!(project.settings().on_collision(), CollisionPolicy::Rename);
    Ok(())
}

#[test]
fn configuration_is_found_in_ancestors() -> anyhow::Result<()> {
    let context = TestContext::with_config(
        r#"
[ids]
union-style = "explicit"
"#,
    );
    context.write_file("tests/unit/.keep", "");

    let project = context.project_in(&context.root().join("tests/unit"))?;

    assert_eq!(
        project.config_path(),
        Some(context.root().join("casework.toml").as_path())
    );
    assert_eq!(project.root(), context.root());
    assert_eq!(project.settings().ids().union_style, IdStyleName::Explicit);
    Ok(())
}

#[test]
fn configured_id_styles_shape_the_calls() -> anyhow::Result<()> {
    let context = TestContext::with_config(
        r#"
[ids]
union-style = "explicit"
param-style = "explicit"
"#,
    );
    let mut namespace = context.project()?.namespace();
    namespace.register(constant("x"))?;
    namespace.register(constant("y"))?;
    fixture_union(&mut namespace, "u", ["x", "y"], None)?;
    let mut test = TestFunction::new("test_styles", ["n", "u"]);
    test.parametrize(&mut namespace, Parametrize::new("n", vec![1]))?;

    let calls = generate_calls(&test, &namespace)?;

    let mut rendered = ids(&calls);
    rendered.sort_unstable();
    assert_eq!(rendered, ["n=1-u/x", "n=1-u/y"]);
    Ok(())
}

#[test]
fn raise_policy_rejects_duplicate_fixtures() -> anyhow::Result<()> {
    let context = TestContext::with_config(
        r#"
[fixtures]
on-collision = "raise"
"#,
    );
    let mut namespace = context.project()?.namespace();
    namespace.register(constant("db"))?;

    let error = namespace.register(constant("db")).unwrap_err();

    assert_eq!(
        error,
        FixtureError::NameCollision {
            name: "db".to_string()
        }
    );
    Ok(())
}

#[test]
fn rename_policy_keeps_both_fixtures() -> anyhow::Result<()> {
    let mut namespace = TestContext::new().project()?.namespace();
    namespace.register(constant("db"))?;

    let renamed = namespace.register(constant("db"))?;

    assert_eq!(renamed, "db_1");
    assert_eq!(
        namespace.get("db_1").map(|fixture| fixture.name()),
        Some("db_1")
    );
    assert!(namespace.contains("db"));
    Ok(())
}

#[test]
fn invalid_configuration_is_reported() {
    let context = TestContext::with_config(
        r#"
[ids]
union-style = "fancy"
"#,
    );

    let error = context.project().unwrap_err();

    assert!(error.to_string().contains("casework.toml"));
}
