use trellis_core::artifact::{Artifact, ArtifactId, ConflictDeclaration, ConflictKind};
use trellis_core::path::{Dependency, Override, PathPolicy, PathSpec};
use trellis_core::version::{Version, VersionRangeUnion};

fn id(s: &str) -> ArtifactId {
    ArtifactId::parse(s).unwrap()
}

#[test]
fn dependency_selects_specs_by_target_path() {
    let dep = Dependency::new(id("g:n:jar:1.0"))
        .with_spec(PathSpec::parse("runtime").unwrap())
        .with_spec(PathSpec::parse("compile+").unwrap())
        .with_spec(PathSpec::parse("runtime?").unwrap());
    assert_eq!(dep.specs_to("runtime").count(), 2);
    assert_eq!(dep.specs_to("compile").count(), 1);
    assert_eq!(dep.specs_to("test").count(), 0);
}

#[test]
fn artifact_policy_lookup() {
    let mut artifact = Artifact::new(id("g:app:jar:1.0"));
    artifact
        .path_policies
        .push(PathPolicy::new("runtime", true, false));
    artifact
        .path_policies
        .push(PathPolicy::new("root", false, true));
    assert!(artifact.path_policy("runtime").unwrap().descend_default);
    assert!(artifact.path_policy("root").unwrap().mandatory_default);
    assert!(artifact.path_policy("compile").is_none());
}

#[test]
fn override_first_match_semantics_are_order_driven() {
    // Two overrides both match; the caller is expected to consult them in
    // declaration order and stop at the first hit.
    let ov_a = Override {
        paths: vec!["*".to_string()],
        group: "g".to_string(),
        name: "n".to_string(),
        kind: "jar".to_string(),
        range: VersionRangeUnion::parse("[1.0,)").unwrap(),
        with_version: Some(Version::parse("9.0").unwrap()),
        with_specs: Vec::new(),
    };
    let mut ov_b = ov_a.clone();
    ov_b.with_version = Some(Version::parse("8.0").unwrap());
    let target = id("g:n:jar:1.5");
    let first = [ov_a.clone(), ov_b.clone()]
        .iter()
        .find(|o| o.matches(&target))
        .cloned()
        .unwrap();
    assert_eq!(first.with_version, ov_a.with_version);
}

#[test]
fn conflict_declaration_serde_round_trip() {
    let decl = ConflictDeclaration::new(ConflictKind::Renamed, id("g:old:jar:1.0"));
    let toml = toml::to_string(&decl).unwrap();
    assert!(toml.contains("renamed"));
    let back: ConflictDeclaration = toml::from_str(&toml).unwrap();
    assert_eq!(back, decl);
}

#[test]
fn artifact_serde_round_trip() {
    let mut artifact = Artifact::new(id("org.example:app:jar:1.0"));
    artifact.dependencies.push(
        Dependency::new(id("org.example:lib:jar:2.0"))
            .with_spec(PathSpec::parse("runtime+(a,b(c))").unwrap()),
    );
    artifact.stub = true;
    let toml = toml::to_string(&artifact).unwrap();
    let back: Artifact = toml::from_str(&toml).unwrap();
    assert_eq!(back.id, artifact.id);
    assert_eq!(back.dependencies, artifact.dependencies);
    assert!(back.stub);
}

#[test]
fn version_serde_uses_string_form() {
    #[derive(serde::Serialize, serde::Deserialize)]
    struct Holder {
        version: Version,
    }
    let holder: Holder = toml::from_str(r#"version = "1.2-rc1~3""#).unwrap();
    assert_eq!(holder.version, Version::parse("1.2-rc1~3").unwrap());
    let out = toml::to_string(&holder).unwrap();
    assert!(out.contains("1.2-rc1~3"));
}
