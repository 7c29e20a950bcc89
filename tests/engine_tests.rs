//! End-to-end tests for the installer engine
//!
//! Each test builds a small ModuleConfig.xml inline and drives the public
//! prime / next_step / submit API the way a front end would.

use std::fs;

use fomod_installer::{
    Answer, DependencyFailure, DependencyKind, Environment, FomodError, InstallPhase, Installer,
    ModuleConfig, PluginKind, Response, StepView, ValidationError,
};
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

fn installer(xml: &str, environment: Environment) -> Installer {
    let config = ModuleConfig::from_xml(xml).expect("config should parse");
    Installer::new(config, environment)
}

fn pick(step: &StepView, choices: &[(&str, &str)]) -> Answer {
    choices.iter().fold(Answer::new(), |answer, (group, plugin)| {
        let group = step.group_named(group).expect("group exists");
        let plugin = group.plugin_named(plugin).expect("plugin exists");
        answer.select(group.id, plugin.id)
    })
}

fn step_names(installer: &mut Installer, answer: impl Fn(&StepView) -> Answer) -> Vec<String> {
    let mut names = Vec::new();
    while let Some(step) = installer.next_step().unwrap() {
        names.push(step.name.clone());
        installer.submit(answer(&step)).unwrap();
    }
    names
}

fn plugin(name: &str, kind: &str, files: &str, flags: &str) -> String {
    format!(
        r#"<plugin name="{name}">
            <description>{name} description</description>
            <files>{files}</files>
            <conditionFlags>{flags}</conditionFlags>
            <typeDescriptor><type name="{kind}"/></typeDescriptor>
        </plugin>"#
    )
}

fn step(name: &str, visible: &str, group_type: &str, plugins: &[String]) -> String {
    format!(
        r#"<installStep name="{name}">
            {visible}
            <optionalFileGroups>
                <group name="{name} Group" type="{group_type}">
                    <plugins order="Explicit">{}</plugins>
                </group>
            </optionalFileGroups>
        </installStep>"#,
        plugins.concat()
    )
}

fn config(head: &str, steps: &[String], tail: &str) -> String {
    format!(
        r#"<config>
            <moduleName>Sample</moduleName>
            {head}
            <installSteps order="Explicit">{}</installSteps>
            {tail}
        </config>"#,
        steps.concat()
    )
}

fn two_choice_config() -> String {
    config(
        "",
        &[step(
            "Choose",
            "",
            "SelectExactlyOne",
            &[
                plugin("A", "Optional", r#"<file source="a.txt" destination="data/a.txt"/>"#, ""),
                plugin("B", "Optional", r#"<file source="b.txt" destination="data/b.txt"/>"#, ""),
            ],
        )],
        "",
    )
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_selecting_b_installs_only_b() {
    let mut installer = installer(&two_choice_config(), Environment::new());
    installer.prime().unwrap();

    let step = installer.next_step().unwrap().expect("one step");
    installer.submit(pick(&step, &[("Choose Group", "B")])).unwrap();
    assert!(installer.next_step().unwrap().is_none());

    let result = installer.result().expect("finished");
    assert_eq!(result.files.len(), 1);
    assert_eq!(result.files["data/b.txt"], "b.txt");
}

#[test]
fn test_old_game_version_fails_priming() {
    let xml = config(
        r#"<moduleDependencies operator="And"><gameDependency version="1.5"/></moduleDependencies>"#,
        &[step("Never", "", "SelectAny", &[])],
        "",
    );
    let mut installer = installer(&xml, Environment::new().with_game_version("1.4.2"));

    let err = installer.prime().unwrap_err();
    match &err {
        FomodError::MissingDependency(failure) => {
            assert_eq!(failure.kind(), DependencyKind::Version);
            assert_eq!(
                failure,
                &DependencyFailure::Version {
                    expected: "1.5".to_string(),
                    actual: "1.4.2".to_string()
                }
            );
        }
        other => panic!("expected dependency failure, got {other:?}"),
    }
    assert_eq!(installer.phase(), InstallPhase::Failed);
    assert!(matches!(installer.next_step(), Err(FomodError::Usage(_))));
}

#[test]
fn test_unknown_game_version_skips_version_check() {
    let xml = config(
        r#"<moduleDependencies><gameDependency version="99"/></moduleDependencies>"#,
        &[],
        "",
    );
    let mut installer = installer(&xml, Environment::new());
    installer.prime().unwrap();
    assert!(installer.next_step().unwrap().is_none());
    assert_eq!(installer.phase(), InstallPhase::Finished);
}

#[test]
fn test_step_hidden_until_flag_set() {
    let visible = r#"<visible><flagDependency flag="UseX" value="yes"/></visible>"#;
    let xml = config(
        "",
        &[
            step("Start", "", "SelectAny", &[plugin("X", "Optional", "", r#"<flag name="UseX">yes</flag>"#)]),
            step("X Options", visible, "SelectAny", &[plugin("Tweak", "Optional", "", "")]),
            step("End", "", "SelectAny", &[]),
        ],
        "",
    );

    let mut skipped = installer(&xml, Environment::new());
    skipped.prime().unwrap();
    assert_eq!(step_names(&mut skipped, |_| Answer::new()), vec!["Start", "End"]);

    let mut shown = installer(&xml, Environment::new());
    shown.prime().unwrap();
    let names = step_names(&mut shown, |step| {
        if step.name == "Start" {
            pick(step, &[("Start Group", "X")])
        } else {
            Answer::new()
        }
    });
    assert_eq!(names, vec!["Start", "X Options", "End"]);
    assert_eq!(shown.result().unwrap().flags["UseX"], "yes");
}

#[test]
fn test_back_navigation_pops_one_layer_per_request() {
    let xml = config(
        r#"<requiredInstallFiles><file source="base.esp"/></requiredInstallFiles>"#,
        &[
            step("One", "", "SelectAny", &[plugin("P1", "Optional", r#"<file source="1.txt"/>"#, r#"<flag name="one">on</flag>"#)]),
            step("Two", "", "SelectAny", &[plugin("P2", "Optional", r#"<file source="2.txt"/>"#, r#"<flag name="two">on</flag>"#)]),
            step("Three", "", "SelectAny", &[]),
        ],
        "",
    );
    let mut installer = installer(&xml, Environment::new());
    installer.prime().unwrap();

    let one = installer.next_step().unwrap().unwrap();
    installer.submit(pick(&one, &[("One Group", "P1")])).unwrap();
    let two = installer.next_step().unwrap().unwrap();
    installer.submit(pick(&two, &[("Two Group", "P2")])).unwrap();
    let three = installer.next_step().unwrap().unwrap();
    assert_eq!(three.name, "Three");
    assert_eq!(installer.collected_files().len(), 3);

    installer.submit(Response::Back).unwrap();
    assert_eq!(installer.next_step().unwrap().unwrap().name, "Two");
    assert!(!installer.flag_states().contains_key("two"));
    assert_eq!(installer.flag_states()["one"], "on");

    installer.submit(Response::Back).unwrap();
    assert_eq!(installer.next_step().unwrap().unwrap().name, "One");
    assert!(installer.flag_states().is_empty());

    // At the boundary only the cursor moves; the required files stay
    installer.submit(Response::Back).unwrap();
    assert_eq!(installer.next_step().unwrap().unwrap().name, "One");
    assert_eq!(installer.collected_files().len(), 1);
    assert_eq!(installer.collected_files()["base.esp"], "base.esp");
}

#[test]
fn test_higher_priority_wins_conflicts() {
    let xml = config(
        "",
        &[step(
            "Pick",
            "",
            "SelectAny",
            &[
                plugin("High", "Optional", r#"<file source="high.dds" destination="tex.dds" priority="5"/>"#, ""),
                plugin("Low", "Optional", r#"<file source="low.dds" destination="tex.dds" priority="1"/>"#, ""),
            ],
        )],
        "",
    );
    let mut installer = installer(&xml, Environment::new());
    installer.prime().unwrap();
    let step = installer.next_step().unwrap().unwrap();
    installer
        .submit(pick(&step, &[("Pick Group", "Low"), ("Pick Group", "High")]))
        .unwrap();
    installer.next_step().unwrap();
    assert_eq!(installer.result().unwrap().files["tex.dds"], "high.dds");
}

#[test]
fn test_later_plugin_wins_same_priority() {
    let xml = config(
        "",
        &[step(
            "Pick",
            "",
            "SelectAny",
            &[
                plugin("First", "Optional", r#"<file source="first.txt" destination="out.txt"/>"#, r#"<flag name="who">first</flag>"#),
                plugin("Second", "Optional", r#"<file source="second.txt" destination="out.txt"/>"#, r#"<flag name="who">second</flag>"#),
            ],
        )],
        "",
    );
    let mut installer = installer(&xml, Environment::new());
    installer.prime().unwrap();
    let step = installer.next_step().unwrap().unwrap();
    // Caller order does not matter; group order does
    installer
        .submit(pick(&step, &[("Pick Group", "Second"), ("Pick Group", "First")]))
        .unwrap();
    installer.next_step().unwrap();
    let result = installer.result().unwrap();
    assert_eq!(result.files["out.txt"], "second.txt");
    assert_eq!(result.flags["who"], "second");
}

#[test]
fn test_required_plugin_is_forced_in() {
    let xml = config(
        "",
        &[step(
            "Core",
            "",
            "SelectExactlyOne",
            &[
                plugin("Base", "Required", r#"<file source="base.txt"/>"#, ""),
                plugin("Addon", "Optional", r#"<file source="addon.txt"/>"#, ""),
            ],
        )],
        "",
    );
    let mut installer = installer(&xml, Environment::new());
    installer.prime().unwrap();
    let step = installer.next_step().unwrap().unwrap();
    assert_eq!(step.groups[0].plugins[0].kind, PluginKind::Required);
    installer.submit(pick(&step, &[("Core Group", "Addon")])).unwrap();
    installer.next_step().unwrap();

    let files = installer.result().unwrap().files;
    assert!(files.contains_key("base.txt"));
    assert!(files.contains_key("addon.txt"));
}

#[test]
fn test_not_usable_selection_fails_the_run() {
    let xml = config(
        "",
        &[step("Pick", "", "SelectAny", &[plugin("Broken", "NotUsable", "", "")])],
        "",
    );
    let mut installer = installer(&xml, Environment::new());
    installer.prime().unwrap();
    let step = installer.next_step().unwrap().unwrap();
    let err = installer.submit(pick(&step, &[("Pick Group", "Broken")])).unwrap_err();
    assert!(matches!(
        err,
        FomodError::Validation(ValidationError::NotUsable { .. })
    ));
    assert_eq!(installer.phase(), InstallPhase::Failed);
    assert!(matches!(installer.submit(Answer::new()), Err(FomodError::Usage(_))));
}

#[test]
fn test_exactly_one_rejects_two() {
    let mut installer = installer(&two_choice_config(), Environment::new());
    installer.prime().unwrap();
    let step = installer.next_step().unwrap().unwrap();
    let err = installer
        .submit(pick(&step, &[("Choose Group", "A"), ("Choose Group", "B")]))
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid answer: Group \"Choose Group\" requires exactly one choice.");
}

#[test]
fn test_exactly_one_accepts_repeated_choice() {
    let mut installer = installer(&two_choice_config(), Environment::new());
    installer.prime().unwrap();
    let step = installer.next_step().unwrap().unwrap();
    installer
        .submit(pick(&step, &[("Choose Group", "A"), ("Choose Group", "A")]))
        .unwrap();
    assert!(installer.next_step().unwrap().is_none());

    let files = installer.result().unwrap().files;
    assert_eq!(files.len(), 1);
    assert_eq!(files["data/a.txt"], "a.txt");
}

#[test]
fn test_conditional_plugin_type_follows_flags() {
    let conditional = r#"<plugin name="Patch">
            <description/>
            <typeDescriptor>
                <dependencyType>
                    <defaultType name="NotUsable"/>
                    <patterns>
                        <pattern>
                            <dependencies><flagDependency flag="base" value="on"/></dependencies>
                            <type name="Recommended"/>
                        </pattern>
                    </patterns>
                </dependencyType>
            </typeDescriptor>
        </plugin>"#;
    let xml = config(
        "",
        &[
            step("Base", "", "SelectAny", &[plugin("Base", "Optional", "", r#"<flag name="base">on</flag>"#)]),
            step("Patches", "", "SelectAny", &[conditional.to_string()]),
        ],
        "",
    );

    let mut installer = installer(&xml, Environment::new());
    installer.prime().unwrap();
    let base = installer.next_step().unwrap().unwrap();
    installer.submit(Answer::new()).unwrap();
    let patches = installer.next_step().unwrap().unwrap();
    assert_eq!(patches.groups[0].plugins[0].kind, PluginKind::NotUsable);

    // Back to Base and pick it; the rebuilt step resolves differently
    installer.submit(Response::Back).unwrap();
    assert_eq!(installer.next_step().unwrap().unwrap().name, base.name);
    let base = installer.current_step().unwrap().clone();
    installer.submit(pick(&base, &[("Base Group", "Base")])).unwrap();
    let patches = installer.next_step().unwrap().unwrap();
    assert_eq!(patches.groups[0].plugins[0].kind, PluginKind::Recommended);
}

#[test]
fn test_conditional_installs_use_final_flags() {
    let tail = r#"<conditionalFileInstalls><patterns>
            <pattern>
                <dependencies operator="Or">
                    <flagDependency flag="mode" value="fast"/>
                    <flagDependency flag="mode" value="smooth"/>
                </dependencies>
                <files><file source="perf/shaders.bin" destination="shaders.bin"/></files>
            </pattern>
            <pattern>
                <dependencies><flagDependency flag="mode" value="pretty"/></dependencies>
                <files><file source="pretty/shaders.bin" destination="shaders.bin"/></files>
            </pattern>
        </patterns></conditionalFileInstalls>"#;
    let xml = config(
        "",
        &[step(
            "Mode",
            "",
            "SelectExactlyOne",
            &[
                plugin("Smooth", "Optional", "", r#"<flag name="mode">smooth</flag>"#),
                plugin("Pretty", "Optional", "", r#"<flag name="mode">pretty</flag>"#),
            ],
        )],
        tail,
    );

    for (choice, expected) in [("Smooth", "perf/shaders.bin"), ("Pretty", "pretty/shaders.bin")] {
        let mut installer = installer(&xml, Environment::new());
        installer.prime().unwrap();
        let step = installer.next_step().unwrap().unwrap();
        installer.submit(pick(&step, &[("Mode Group", choice)])).unwrap();
        assert!(installer.collected_files().is_empty());
        assert!(installer.next_step().unwrap().is_none());
        assert_eq!(installer.result().unwrap().files["shaders.bin"], expected);
    }
}

fn overlapping_patterns_config(step_file: &str) -> String {
    let tail = r#"<conditionalFileInstalls><patterns>
            <pattern>
                <dependencies><flagDependency flag="extras" value="on"/></dependencies>
                <files><file source="first/out.txt" destination="out.txt"/></files>
            </pattern>
            <pattern>
                <dependencies><flagDependency flag="extras" value="on"/></dependencies>
                <files><file source="second/out.txt" destination="out.txt"/></files>
            </pattern>
        </patterns></conditionalFileInstalls>"#;
    config(
        "",
        &[step(
            "Extras",
            "",
            "SelectAny",
            &[plugin("Extras", "Optional", step_file, r#"<flag name="extras">on</flag>"#)],
        )],
        tail,
    )
}

fn run_with_extras(xml: &str) -> String {
    let mut installer = installer(xml, Environment::new());
    installer.prime().unwrap();
    let step = installer.next_step().unwrap().unwrap();
    installer.submit(pick(&step, &[("Extras Group", "Extras")])).unwrap();
    assert!(installer.next_step().unwrap().is_none());
    installer.result().unwrap().files["out.txt"].clone()
}

#[test]
fn test_later_conditional_pattern_wins_same_priority() {
    let xml = overlapping_patterns_config(r#"<file source="step/out.txt" destination="out.txt"/>"#);
    assert_eq!(run_with_extras(&xml), "second/out.txt");
}

#[test]
fn test_higher_priority_step_file_beats_conditional_pattern() {
    let xml = overlapping_patterns_config(r#"<file source="step/out.txt" destination="out.txt" priority="3"/>"#);
    assert_eq!(run_with_extras(&xml), "step/out.txt");
}

#[test]
fn test_file_dependency_checks_destination() {
    let xml = config(
        r#"<moduleDependencies>
            <fileDependency file="Data\Skyrim.esm" state="Active"/>
            <fileDependency file="Data\Conflict.esp" state="Missing"/>
        </moduleDependencies>"#,
        &[],
        "",
    );
    let tmp = TempDir::new().unwrap();
    let data = tmp.path().join("Data");
    fs::create_dir(&data).unwrap();

    let environment = Environment::new().with_destination(tmp.path());
    let mut missing_master = installer(&xml, environment.clone());
    let err = missing_master.prime().unwrap_err();
    assert_eq!(err.to_string(), "File dependency not met. Data\\Skyrim.esm should be active.");

    fs::write(data.join("Skyrim.esm"), b"").unwrap();
    let mut ready = installer(&xml, environment.clone());
    ready.prime().unwrap();

    fs::write(data.join("Conflict.esp"), b"").unwrap();
    let mut conflicting = installer(&xml, environment);
    assert!(matches!(
        conflicting.prime(),
        Err(FomodError::MissingDependency(DependencyFailure::File { .. }))
    ));
}

#[test]
fn test_step_order_attribute_is_respected() {
    let xml = r#"<config>
            <moduleName>Ordered</moduleName>
            <installSteps order="Descending">
                <installStep name="Alpha"><optionalFileGroups/></installStep>
                <installStep name="Gamma"><optionalFileGroups/></installStep>
                <installStep name="Beta"><optionalFileGroups/></installStep>
            </installSteps>
        </config>"#;
    let mut installer = installer(xml, Environment::new());
    installer.prime().unwrap();
    assert_eq!(step_names(&mut installer, |_| Answer::new()), vec!["Gamma", "Beta", "Alpha"]);
}

#[test]
fn test_installer_from_package_folder() {
    let tmp = TempDir::new().unwrap();
    let fomod = tmp.path().join("fomod");
    fs::create_dir(&fomod).unwrap();
    fs::write(
        fomod.join("info.xml"),
        "<fomod><Author> Someone </Author><Version>2.1</Version></fomod>",
    )
    .unwrap();
    fs::write(fomod.join("ModuleConfig.xml"), two_choice_config()).unwrap();

    let mut installer = Installer::from_path(tmp.path(), Environment::new()).unwrap();
    assert_eq!(installer.metadata().name, "Sample");
    assert_eq!(installer.metadata().author, "Someone");
    assert_eq!(installer.metadata().version, "2.1");

    installer.prime().unwrap();
    let step = installer.next_step().unwrap().unwrap();
    installer.submit(fomod_installer::default_answer(&step)).unwrap();
    assert!(installer.next_step().unwrap().is_none());
    assert_eq!(installer.result().unwrap().files.len(), 1);
}

#[test]
fn test_missing_package_is_config_error() {
    let tmp = TempDir::new().unwrap();
    assert!(matches!(
        Installer::from_path(tmp.path(), Environment::new()),
        Err(FomodError::Config(_))
    ));
}
