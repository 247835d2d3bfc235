//! End-to-end incremental build tests
//!
//! Drives compile, link and archive targets through the same
//! prerequisites → staleness → run cycle a build engine uses, with the
//! mock toolchain standing in for the compiler.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use native_build::config::keys;
use native_build::mock::MockToolchain;
use native_build::{
    check_staleness, Archive, BuildContext, CacheStatus, CompileUnit, InvalidReason, Link,
    Platform, StaleReason, Staleness, Target,
};
use serde_json::json;
use tempfile::TempDir;

fn set_age(path: &Path, secs_ago: u64) {
    let time = SystemTime::now() - Duration::from_secs(secs_ago);
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

fn context(dir: &TempDir, mock: &MockToolchain) -> BuildContext {
    BuildContext::builder(dir.path())
        .platform(Platform::Unix)
        .toolchain("mock", Arc::new(mock.clone()))
        .option(keys::COMPILERS, "mock")
        .build()
        .unwrap()
}

/// One engine pass: resolve prerequisites, check staleness, run if stale.
/// Returns whether the target ran and the digest to record.
fn build(target: &dyn Target, ctx: &BuildContext, recorded: Option<&str>) -> (bool, String) {
    target.prerequisites(ctx).unwrap();
    let stale = check_staleness(target, ctx, recorded).unwrap().is_stale();
    if stale {
        target.run(ctx).unwrap();
    }
    (stale, target.implicit_inputs_digest(ctx).unwrap())
}

// === Header Touch ===

#[test]
fn test_touching_header_regenerates_and_recompiles() {
    let dir = TempDir::new().unwrap();
    let a_cpp = dir.path().join("a.cpp");
    let a_h = dir.path().join("a.h");
    fs::write(&a_cpp, "#include \"a.h\"\nint main() { return answer(); }\n").unwrap();
    fs::write(&a_h, "int answer() { return 42; }\n").unwrap();
    set_age(&a_cpp, 300);
    set_age(&a_h, 300);

    let mock = MockToolchain::new();
    let ctx = context(&dir, &mock);
    let unit = CompileUnit::cpp("obj/a.o", ["a.cpp"]).build().unwrap();
    let cache = unit.dependency_cache();

    // First build compiles and caches a.h.
    let (ran, digest) = build(&unit, &ctx, None);
    assert!(ran);
    assert_eq!(mock.compile_count(), 1);
    let record = fs::read_to_string(cache.record_path(&ctx)).unwrap();
    assert!(record.lines().any(|l| l == a_h.to_string_lossy()));

    set_age(&cache.record_path(&ctx), 200);
    set_age(&dir.path().join("obj/a.o"), 100);

    // Nothing changed: no scan, no compile.
    let (ran, _) = build(&unit, &ctx, Some(&digest));
    assert!(!ran);
    assert_eq!(mock.scan_count(), 1);
    assert_eq!(mock.compile_count(), 1);

    // Touch only the header: newer than the object and the record.
    set_age(&a_h, 50);
    assert_eq!(
        cache.status(&ctx).unwrap(),
        CacheStatus::Invalid(InvalidReason::EntryNewer(a_h.to_string_lossy().into_owned()))
    );
    assert_eq!(
        check_staleness(&unit, &ctx, Some(&digest)).unwrap(),
        Staleness::Stale(StaleReason::PrerequisiteNewer(a_h.clone()))
    );
    assert_eq!(mock.scan_count(), 2, "touched header regenerates the record");

    unit.run(&ctx).unwrap();
    assert_eq!(mock.compile_count(), 2);

    // Settled again.
    assert_eq!(
        check_staleness(&unit, &ctx, Some(&digest)).unwrap(),
        Staleness::UpToDate
    );
    assert_eq!(mock.scan_count(), 2);
}

// === Deleted Dependency ===

#[test]
fn test_deleted_dependency_forces_rescan() {
    let dir = TempDir::new().unwrap();
    let a_cpp = dir.path().join("a.cpp");
    let a_h = dir.path().join("a.h");
    let b_h = dir.path().join("b.h");
    fs::write(&a_cpp, "#include \"a.h\"\n").unwrap();
    fs::write(&a_h, "#include \"b.h\"\n").unwrap();
    fs::write(&b_h, "\n").unwrap();
    for file in [&a_cpp, &a_h, &b_h] {
        set_age(file, 300);
    }

    let mock = MockToolchain::new();
    let ctx = context(&dir, &mock);
    let unit = CompileUnit::cpp("obj/a.o", ["a.cpp"]).build().unwrap();
    let cache = unit.dependency_cache();

    let before = cache.dependencies(&ctx).unwrap();
    assert!(before.contains(&b_h.to_string_lossy().into_owned()));

    // a.h stops including b.h without a newer timestamp, then b.h goes.
    fs::write(&a_h, "\n").unwrap();
    set_age(&a_h, 300);
    fs::remove_file(&b_h).unwrap();

    let after = cache.dependencies(&ctx).unwrap();
    assert_eq!(mock.scan_count(), 2);
    assert!(!after.contains(&b_h.to_string_lossy().into_owned()));
    assert!(after.contains(&a_h.to_string_lossy().into_owned()));
}

// === Option Changes ===

#[test]
fn test_flag_change_marks_compile_stale_before_timestamps() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.c"), "int x;\n").unwrap();
    set_age(&dir.path().join("a.c"), 300);
    let mock = MockToolchain::new();
    let ctx = context(&dir, &mock);

    let unit = CompileUnit::c("obj/a.o", ["a.c"]).flags(["-O2"]).build().unwrap();
    let (_, digest) = build(&unit, &ctx, None);

    let changed = CompileUnit::c("obj/a.o", ["a.c"]).flags(["-O3"]).build().unwrap();
    assert_eq!(
        check_staleness(&changed, &ctx, Some(&digest)).unwrap(),
        Staleness::Stale(StaleReason::InputsChanged)
    );
}

#[test]
fn test_link_stale_when_only_libs_change() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.o"), "obj").unwrap();
    set_age(&dir.path().join("a.o"), 300);
    let mock = MockToolchain::new();
    let ctx = BuildContext::builder(dir.path())
        .platform(Platform::Unix)
        .property_list("EXTRA", ["ssl", "crypto"])
        .toolchain("mock", Arc::new(mock.clone()))
        .option(keys::COMPILERS, "mock")
        .build()
        .unwrap();

    let link = Link::executable("bin/app", ["a.o"]).libs(["z"]).build().unwrap();
    let (ran, digest) = build(&link, &ctx, None);
    assert!(ran);
    assert_eq!(
        check_staleness(&link, &ctx, Some(&digest)).unwrap(),
        Staleness::UpToDate
    );

    let relinked = Link::executable("bin/app", ["a.o"])
        .libs(["z", "${EXTRA[]}"])
        .build()
        .unwrap();
    assert_eq!(
        check_staleness(&relinked, &ctx, Some(&digest)).unwrap(),
        Staleness::Stale(StaleReason::InputsChanged)
    );

    // A property change behind the same declaration is a change too.
    let ctx2 = BuildContext::builder(dir.path())
        .platform(Platform::Unix)
        .property_list("EXTRA", ["ssl"])
        .toolchain("mock", Arc::new(mock.clone()))
        .option(keys::COMPILERS, "mock")
        .build()
        .unwrap();
    assert_ne!(
        relinked.implicit_inputs_digest(&ctx).unwrap(),
        relinked.implicit_inputs_digest(&ctx2).unwrap()
    );
}

#[test]
fn test_link_stale_when_global_libs_change() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.o"), "obj").unwrap();
    let mock = MockToolchain::new();
    let link = Link::shared_library("lib/libcore.so", ["a.o"]).build().unwrap();

    let plain = context(&dir, &mock);
    let with_libs = BuildContext::builder(dir.path())
        .platform(Platform::Unix)
        .toolchain("mock", Arc::new(mock.clone()))
        .option(keys::COMPILERS, "mock")
        .option(keys::LIBS, json!(["pthread"]))
        .build()
        .unwrap();

    assert_ne!(
        link.implicit_inputs_digest(&plain).unwrap(),
        link.implicit_inputs_digest(&with_libs).unwrap()
    );
}

#[test]
fn test_archive_reorder_is_stale() {
    let dir = TempDir::new().unwrap();
    for obj in ["a.o", "b.o"] {
        fs::write(dir.path().join(obj), obj).unwrap();
        set_age(&dir.path().join(obj), 300);
    }
    let mock = MockToolchain::new();
    let ctx = context(&dir, &mock);

    let archive = Archive::new("lib/libx.a", ["a.o", "b.o"]).unwrap();
    let (ran, digest) = build(&archive, &ctx, None);
    assert!(ran);

    let reordered = Archive::new("lib/libx.a", ["b.o", "a.o"]).unwrap();
    assert_eq!(
        check_staleness(&reordered, &ctx, Some(&digest)).unwrap(),
        Staleness::Stale(StaleReason::InputsChanged)
    );
}

// === Full Pipeline ===

#[test]
fn test_compile_archive_link_pipeline() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("util.c"), "#include \"util.h\"\n").unwrap();
    fs::write(dir.path().join("util.h"), "\n").unwrap();
    fs::write(dir.path().join("main.c"), "#include \"util.h\"\n").unwrap();
    let mock = MockToolchain::new();
    let ctx = BuildContext::builder(dir.path())
        .platform(Platform::Unix)
        .toolchain("mock", Arc::new(mock.clone()))
        .option(keys::COMPILERS, "mock")
        .target("obj/util.o")
        .target("obj/main.o")
        .target("lib/libutil.a")
        .build()
        .unwrap();

    let util_o = native_build::objectname(&ctx, "obj/util").unwrap();
    let main_o = native_build::objectname(&ctx, "obj/main").unwrap();
    let lib = native_build::staticlibname(&ctx, "lib/util").unwrap();
    let app = native_build::exename(&ctx, "bin/app").unwrap();

    let targets: Vec<Box<dyn Target>> = vec![
        Box::new(CompileUnit::c(&util_o, ["util.c"]).build().unwrap()),
        Box::new(CompileUnit::c(&main_o, ["main.c"]).build().unwrap()),
        Box::new(Archive::new(&lib, [util_o.as_str()]).unwrap()),
        Box::new(
            Link::executable(&app, [main_o.as_str()])
                .dependencies([lib.as_str()])
                .libs(["util"])
                .lib_paths(["lib"])
                .build()
                .unwrap(),
        ),
    ];

    for target in &targets {
        let (ran, _) = build(target.as_ref(), &ctx, None);
        assert!(ran, "{} should build", target.name());
    }

    assert!(dir.path().join("lib/libutil.a").exists());
    assert!(dir.path().join("bin/app").exists());
    assert_eq!(mock.compile_count(), 2);

    for target in &targets {
        target.clean(&ctx).unwrap();
        assert!(!target.output_path(&ctx).exists());
    }
}
