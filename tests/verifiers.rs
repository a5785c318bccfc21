mod common;

use common::TestEnv;
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;

const PODFILE: &str = "source 'https://cdn.cocoapods.org/'\nplatform :ios, '13.0'\n\ntarget 'UnityFramework' do\n  pod 'Firebase/Analytics', '10.22.0'\nend\nuse_frameworks! :linkage => :static\n";
const LOCK: &str = "PODS:\n  - FirebaseAnalytics (10.22.0)\n";

fn fail_lines(stdout: &[u8]) -> usize {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|line| line.contains("FAIL "))
        .count()
}

fn ios_project(env: &TestEnv) {
    env.write("Builds/iOS/Podfile", PODFILE);
    env.write("Builds/iOS/Podfile.lock", LOCK);
    env.write("Builds/iOS/Pods/Manifest.lock", LOCK);
    fs::create_dir_all(env.path("Builds/iOS/Unity-iPhone.xcworkspace")).unwrap();
}

#[test]
fn cocoapods_verify_reports_every_check_on_an_empty_project() {
    let env = TestEnv::new();
    fs::create_dir_all(env.path("Builds/iOS")).unwrap();
    let output = env
        .bin("cocoapods")
        .arg("verify")
        .env("PATH", &env.fakebin)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(fail_lines(&output.stdout), 7);
}

#[test]
fn cocoapods_verify_json_lists_every_check() {
    let env = TestEnv::new();
    fs::create_dir_all(env.path("Builds/iOS")).unwrap();
    let output = env
        .bin("cocoapods")
        .args(["verify", "--json"])
        .env("PATH", &env.fakebin)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["ok"], false);
    let checks = value["data"]["checks"].as_array().unwrap();
    assert_eq!(checks.len(), 7);
    assert!(checks.iter().all(|check| check["passed"] == false));
}

#[test]
fn cocoapods_verify_passes_a_healthy_project() {
    let env = TestEnv::new();
    env.fake_tool("pod", "echo 1.15.2");
    ios_project(&env);

    env.bin("cocoapods")
        .arg("verify")
        .assert()
        .success()
        .stdout(contains("PASS pod tool: 1.15.2"))
        .stdout(contains("FAIL").not());
}

#[test]
fn cocoapods_verify_flags_a_stale_install() {
    let env = TestEnv::new();
    env.fake_tool("pod", "echo 1.15.2");
    ios_project(&env);
    env.write("Builds/iOS/Pods/Manifest.lock", "PODS:\n  - FirebaseAnalytics (10.0.0)\n");

    env.bin("cocoapods")
        .args(["verify", "--min-ios", "14.0"])
        .assert()
        .code(1)
        .stdout(contains("FAIL Pods/Manifest.lock"))
        .stdout(contains("FAIL deployment target"));
}

#[test]
fn cocoapods_patch_is_idempotent() {
    let env = TestEnv::new();
    env.write(
        "Builds/iOS/Podfile",
        "platform :ios, '11.0'\n\ntarget 'UnityFramework' do\nend\n",
    );

    env.bin("cocoapods")
        .args(["patch", "--min-ios", "13.0"])
        .assert()
        .success();
    let patched = fs::read_to_string(env.path("Builds/iOS/Podfile")).unwrap();
    assert!(patched.contains("platform :ios, '13.0'"), "{}", patched);

    env.bin("cocoapods")
        .args(["patch", "--min-ios", "13.0"])
        .assert()
        .success()
        .stdout(contains("already up to date"));
    assert_eq!(fs::read_to_string(env.path("Builds/iOS/Podfile")).unwrap(), patched);
}

#[test]
fn cocoapods_patch_without_podfile_fails() {
    let env = TestEnv::new();
    env.bin("cocoapods")
        .arg("patch")
        .assert()
        .code(1)
        .stdout(contains("Podfile not found"));
}

#[test]
fn cocoapods_rejects_a_bad_version() {
    let env = TestEnv::new();
    env.bin("cocoapods")
        .args(["verify", "--min-ios", "thirteen"])
        .assert()
        .code(1);
}

fn unity_project(env: &TestEnv) {
    env.write(
        "Game/Packages/manifest.json",
        r#"{"dependencies":{"com.google.external-dependency-manager":"1.2.179","com.unity.ugui":"1.0.0"}}"#,
    );
    env.write(
        "Game/Assets/Firebase/Editor/AnalyticsDependencies.xml",
        r#"<dependencies>
  <iosPods>
    <iosPod name="Firebase/Analytics" version="10.22.0" minTargetSdk="12.0" />
  </iosPods>
</dependencies>
"#,
    );
}

#[test]
fn edm4u_configure_then_verify_passes() {
    let env = TestEnv::new();
    unity_project(&env);
    let pod = env.fake_tool("pod", "echo 1.15.2");

    env.bin("edm4u")
        .args(["--project", "Game", "verify"])
        .assert()
        .code(1)
        .stdout(contains("FAIL ProjectSettings/GvhProjectSettings.xml"));

    env.bin("edm4u")
        .args(["--project", "Game", "configure", "--pod"])
        .arg(&pod)
        .assert()
        .success()
        .stdout(contains("set "));
    let settings =
        fs::read_to_string(env.path("Game/ProjectSettings/GvhProjectSettings.xml")).unwrap();
    assert!(settings.contains(&pod.display().to_string()), "{}", settings);

    env.bin("edm4u")
        .args(["--project", "Game", "verify"])
        .assert()
        .success()
        .stdout(contains("FAIL").not());

    env.bin("edm4u")
        .args(["--project", "Game", "configure", "--pod"])
        .arg(&pod)
        .assert()
        .success()
        .stdout(contains("already configured"));
}

#[test]
fn edm4u_verify_flags_unpinned_pods() {
    let env = TestEnv::new();
    unity_project(&env);
    env.write(
        "Game/Assets/Ads/Editor/AdsDependencies.xml",
        r#"<dependencies><iosPods><iosPod name="Google-Mobile-Ads-SDK" /></iosPods></dependencies>"#,
    );

    env.bin("edm4u")
        .args(["--project", "Game", "verify"])
        .assert()
        .code(1)
        .stdout(contains("FAIL iOS pods pinned").and(contains("Google-Mobile-Ads-SDK")));
}

#[test]
fn edm4u_configure_without_pod_fails() {
    let env = TestEnv::new();
    unity_project(&env);
    env.bin("edm4u")
        .args(["--project", "Game", "configure", "--pod"])
        .arg(env.path("no-such-pod"))
        .assert()
        .code(1)
        .stdout(contains("`pod` is not on PATH"));
    assert!(!env.path("Game/ProjectSettings").exists());
}

#[test]
fn edm4u_resolve_runs_the_editor_in_batch_mode() {
    let env = TestEnv::new();
    unity_project(&env);
    let log = env.path("unity-args.txt");
    let unity = env.fake_tool("Unity", &format!("echo \"$@\" > {}", log.display()));

    env.bin("edm4u")
        .args(["--project", "Game", "resolve"])
        .env("UNITY_PATH", &unity)
        .assert()
        .success()
        .stdout(contains("dependencies resolved"));

    let args = fs::read_to_string(&log).unwrap();
    assert!(args.starts_with("-batchmode -nographics -quit -projectPath Game"), "{}", args);
    assert!(args.contains("-executeMethod GooglePlayServices.PlayServicesResolver.MenuForceResolve"));
}

#[test]
fn edm4u_resolve_reports_the_log_tail() {
    let env = TestEnv::new();
    unity_project(&env);
    let unity = env.fake_tool("Unity", "echo 'Resolution failed: pod install error'; exit 1");

    env.bin("edm4u")
        .args(["--project", "Game", "resolve", "--unity"])
        .arg(&unity)
        .assert()
        .code(1)
        .stdout(contains("Resolution failed"));
}

#[test]
fn edm4u_resolve_needs_an_editor() {
    let env = TestEnv::new();
    unity_project(&env);
    env.bin("edm4u")
        .args(["--project", "Game", "resolve"])
        .assert()
        .code(1)
        .stdout(contains("UNITY_PATH is not set"));
}
