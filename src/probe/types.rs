use crate::Result;
use crate::probe::manifest::SuiteManifest;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// 测试描述：类名 + 可选的方法名
///
/// 没有方法名的描述是测试树中的类级节点，不可执行。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestDescription {
    pub class_name: String,
    pub method_name: Option<String>,
}

impl TestDescription {
    /// 创建可执行的方法级描述
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: Some(method_name.into()),
        }
    }

    /// 创建类级节点描述
    pub fn class_marker(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: None,
        }
    }

    pub fn is_executable(&self) -> bool {
        self.method_name.is_some()
    }
}

impl fmt::Display for TestDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method_name {
            Some(method) => write!(f, "{}#{}", self.class_name, method),
            None => write!(f, "{}", self.class_name),
        }
    }
}

/// 可寻址的调用目标，交给容器的 `call`
#[derive(Debug, Clone, PartialEq)]
pub struct TestAddress {
    pub id: Uuid,
    pub description: TestDescription,
    pub arguments: Vec<String>,
}

impl TestAddress {
    pub fn new(description: TestDescription) -> Self {
        Self {
            id: Uuid::new_v4(),
            description,
            arguments: Vec::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<String>) -> Self {
        self.arguments = arguments;
        self
    }
}

/// 已构建的探针：不可变的字节流 + 它服务的测试列表
#[derive(Debug, Clone, PartialEq)]
pub struct Probe {
    name: String,
    bytes: Vec<u8>,
    tests: Vec<TestDescription>,
}

impl Probe {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, tests: Vec<TestDescription>) -> Self {
        Self {
            name: name.into(),
            bytes,
            tests,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn tests(&self) -> &[TestDescription] {
        &self.tests
    }

    /// 空测试列表的探针服务任意测试
    pub fn serves(&self, description: &TestDescription) -> bool {
        self.tests.is_empty() || self.declares(description)
    }

    /// 是否显式声明了该测试
    pub fn declares(&self, description: &TestDescription) -> bool {
        self.tests.iter().any(|t| t == description)
    }
}

enum Payload {
    Bytes(Vec<u8>),
    Manifest(SuiteManifest),
}

/// 探针构建器
///
/// `build` 只真正构建一次，之后的调用返回同一个 `Arc<Probe>`，
/// 因此同一探针可以在多次容器激活之间复用。
pub struct ProbeBuilder {
    name: String,
    tests: Vec<TestDescription>,
    payload: Payload,
    built: OnceCell<Arc<Probe>>,
}

impl ProbeBuilder {
    /// 由原始字节构建（对 reactor 不透明）
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            tests: Vec::new(),
            payload: Payload::Bytes(bytes),
            built: OnceCell::new(),
        }
    }

    /// 由套件清单构建，清单序列化为 TOML 作为探针内容
    pub fn from_manifest(manifest: SuiteManifest) -> Self {
        let tests = manifest.descriptions();
        Self {
            name: manifest.probe.name.clone(),
            tests,
            payload: Payload::Manifest(manifest),
            built: OnceCell::new(),
        }
    }

    pub fn with_test(mut self, description: TestDescription) -> Self {
        self.tests.push(description);
        self
    }

    pub fn with_tests(mut self, tests: impl IntoIterator<Item = TestDescription>) -> Self {
        self.tests.extend(tests);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn build(&self) -> Result<Arc<Probe>> {
        self.built
            .get_or_try_init(|| {
                let bytes = match &self.payload {
                    Payload::Bytes(bytes) => bytes.clone(),
                    Payload::Manifest(manifest) => manifest.to_toml()?.into_bytes(),
                };
                tracing::debug!(probe = %self.name, size = bytes.len(), "Probe built");
                Ok(Arc::new(Probe::new(self.name.clone(), bytes, self.tests.clone())))
            })
            .cloned()
    }
}
