use crate::probe::{SuiteManifest, TestDescription};

/// 一个测试类及其成员，保持原始顺序
#[derive(Debug, Clone, PartialEq)]
pub struct TestClass {
    pub name: String,
    pub tests: Vec<TestDescription>,
}

impl TestClass {
    /// 可执行测试数量（不含类级节点）
    pub fn executable_count(&self) -> usize {
        self.tests.iter().filter(|t| t.is_executable()).count()
    }
}

/// 按类分组的测试树
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestPlan {
    pub classes: Vec<TestClass>,
}

impl TestPlan {
    /// 按类首次出现的顺序分组
    pub fn from_descriptions(descriptions: impl IntoIterator<Item = TestDescription>) -> Self {
        let mut classes: Vec<TestClass> = Vec::new();
        for description in descriptions {
            match classes.iter_mut().find(|c| c.name == description.class_name) {
                Some(class) => class.tests.push(description),
                None => classes.push(TestClass {
                    name: description.class_name.clone(),
                    tests: vec![description],
                }),
            }
        }
        Self { classes }
    }

    pub fn from_manifest(manifest: &SuiteManifest) -> Self {
        Self::from_descriptions(manifest.descriptions())
    }

    pub fn executable_count(&self) -> usize {
        self.classes.iter().map(TestClass::executable_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.executable_count() == 0
    }
}
