use turnstile_license::{
    BetaRestriction, BuildType, DomainRestriction, HardwareRestriction, LicenseError,
    LicenseFactory, MemoryRestriction, Restriction, RestrictionRegistry, TrialRestriction,
    UsageRestriction,
};

#[test]
fn standard_registry_knows_every_builtin_kind() {
    let registry = RestrictionRegistry::standard();
    assert_eq!(
        registry.kinds(),
        vec!["Beta", "Domain", "Hardware", "Memory", "Trial", "Usage"]
    );
}

#[test]
fn bare_kind_yields_zero_value() {
    let registry = RestrictionRegistry::standard();
    for kind in registry.kinds() {
        let r = registry.create_restriction(kind).unwrap().unwrap();
        assert_eq!(r.kind(), kind);
        let zero: Restriction = match kind {
            "Memory" => MemoryRestriction::default().into(),
            "Trial" => TrialRestriction::default().into(),
            "Hardware" => HardwareRestriction::default().into(),
            "Beta" => BetaRestriction::default().into(),
            "Domain" => DomainRestriction::default().into(),
            "Usage" => UsageRestriction::default().into(),
            other => panic!("unexpected kind {other}"),
        };
        assert_eq!(r, zero);
    }
}

#[test]
fn first_argument_sets_primary_threshold() {
    let registry = RestrictionRegistry::standard();
    assert_eq!(
        registry.create_restriction("Memory:4096").unwrap(),
        Some(MemoryRestriction::new(4096).into())
    );
    assert_eq!(
        registry.create_restriction("Usage:12").unwrap(),
        Some(UsageRestriction::new(12).into())
    );
    assert_eq!(
        registry.create_restriction("Trial:30").unwrap(),
        Some(TrialRestriction::new(30).into())
    );
}

#[test]
fn trial_takes_positional_arguments() {
    let registry = RestrictionRegistry::standard();
    let r = registry.create_restriction("Trial:30:100:2").unwrap().unwrap();
    assert_eq!(
        r,
        TrialRestriction::new(30)
            .with_run_count(100)
            .with_run_instances(2)
            .into()
    );
}

#[test]
fn string_arguments() {
    let registry = RestrictionRegistry::standard();
    assert_eq!(
        registry.create_restriction("Domain:acme.example").unwrap(),
        Some(DomainRestriction::new("acme.example").into())
    );
    assert_eq!(
        registry.create_restriction("Beta:beta").unwrap(),
        Some(BetaRestriction::new(BuildType::Beta).into())
    );
}

#[test]
fn hardware_key_may_contain_colons() {
    let registry = RestrictionRegistry::standard();
    assert_eq!(
        registry.create_restriction("Hardware:AA:BB:CC").unwrap(),
        Some(HardwareRestriction::new("AA:BB:CC").into())
    );
}

#[test]
fn unknown_kind_is_absent_not_an_error() {
    let registry = RestrictionRegistry::standard();
    assert!(registry.create_restriction("Quantum").unwrap().is_none());
    assert!(registry.create_restriction("Quantum:5").unwrap().is_none());
    assert!(registry.create_restriction("").unwrap().is_none());
}

#[test]
fn require_maps_unknown_kind_to_error() {
    let registry = RestrictionRegistry::standard();
    let err = registry.require_restriction("Quantum:5").unwrap_err();
    assert!(matches!(err, LicenseError::UnsupportedRestrictionKind(k) if k == "Quantum"));
}

#[test]
fn bad_argument_is_malformed() {
    let registry = RestrictionRegistry::standard();
    assert!(matches!(
        registry.create_restriction("Memory:plenty"),
        Err(LicenseError::MalformedEncoding(_))
    ));
    assert!(matches!(
        registry.create_restriction("Beta:nightly"),
        Err(LicenseError::MalformedEncoding(_))
    ));
}

#[test]
fn empty_registry_supports_nothing() {
    let registry = RestrictionRegistry::empty();
    assert!(registry.kinds().is_empty());
    assert!(registry.create_restriction("Memory:1").unwrap().is_none());
}

#[test]
fn partial_registry() {
    let mut registry = RestrictionRegistry::empty();
    registry.register_rule::<MemoryRestriction>();
    assert!(registry.supports("Memory"));
    assert!(!registry.supports("Trial"));
    assert!(registry.create_restriction("Trial:1").unwrap().is_none());
}

#[test]
fn custom_constructor_replaces_builtin() {
    fn at_least_one_gig(args: &[&str]) -> turnstile_license::LicenseResult<Restriction> {
        let mb = args.first().and_then(|a| a.parse().ok()).unwrap_or(0u64);
        Ok(MemoryRestriction::new(mb.max(1024)).into())
    }

    let mut registry = RestrictionRegistry::standard();
    registry.register("Memory", at_least_one_gig);
    assert_eq!(
        registry.create_restriction("Memory:10").unwrap(),
        Some(MemoryRestriction::new(1024).into())
    );
}

#[test]
fn feature_and_field_constructors() {
    let registry = RestrictionRegistry::standard();
    let feature = registry.create_feature("Reporting");
    assert_eq!(feature.name, "Reporting");
    assert!(feature.data.is_none());
    let field = registry.create_field("seats");
    assert_eq!(field.name, "seats");
}
