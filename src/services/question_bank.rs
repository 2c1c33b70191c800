//! 兜底题库 - 业务能力层
//!
//! 解析失败时按科目分桶给出固定模板题。
//! 通用分桶的模板包含 `{topic}` 占位符，渲染时替换为主题。

use crate::models::{Question, QuestionType, SubjectBucket};

/// 一道模板题
#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub prompt: &'static str,
    pub options: [&'static str; 4],
    pub answer: &'static str,
    pub explanation: &'static str,
}

const MATHEMATICS: &[Template] = &[
    Template {
        prompt: "What is the solution to the equation 2x + 5 = 13?",
        options: ["x = 4", "x = 9", "x = 3", "x = 6"],
        answer: "x = 4",
        explanation: "Subtract 5 from both sides: 2x = 8, then divide by 2: x = 4",
    },
    Template {
        prompt: "Which property allows us to write a(b + c) = ab + ac?",
        options: [
            "Distributive Property",
            "Commutative Property",
            "Associative Property",
            "Identity Property",
        ],
        answer: "Distributive Property",
        explanation: "The distributive property allows multiplication to be distributed over addition.",
    },
    Template {
        prompt: "What is the slope of the line y = 3x - 7?",
        options: ["3", "-7", "1/3", "7"],
        answer: "3",
        explanation: "In slope-intercept form y = mx + b, the coefficient of x (m) is the slope.",
    },
    Template {
        prompt: "Simplify: (x²)(x³)",
        options: ["x⁵", "x⁶", "x¹", "2x⁵"],
        answer: "x⁵",
        explanation: "When multiplying powers with the same base, add the exponents: x² × x³ = x^(2+3) = x⁵",
    },
    Template {
        prompt: "What is the y-intercept of the line 2x + 3y = 12?",
        options: ["(0, 4)", "(0, 6)", "(6, 0)", "(4, 0)"],
        answer: "(0, 4)",
        explanation: "Set x = 0: 2(0) + 3y = 12, so 3y = 12, y = 4. The y-intercept is (0, 4).",
    },
];

const BIOLOGY: &[Template] = &[
    Template {
        prompt: "What is the powerhouse of the cell?",
        options: ["Mitochondria", "Nucleus", "Ribosome", "Endoplasmic Reticulum"],
        answer: "Mitochondria",
        explanation: "Mitochondria produce ATP through cellular respiration, providing energy for cellular processes.",
    },
    Template {
        prompt: "Which process converts light energy into chemical energy?",
        options: ["Photosynthesis", "Cellular Respiration", "Fermentation", "Glycolysis"],
        answer: "Photosynthesis",
        explanation: "Photosynthesis uses light energy to convert CO₂ and water into glucose and oxygen.",
    },
    Template {
        prompt: "What are the building blocks of proteins?",
        options: ["Amino acids", "Nucleotides", "Fatty acids", "Monosaccharides"],
        answer: "Amino acids",
        explanation: "Proteins are polymers made up of amino acid monomers linked by peptide bonds.",
    },
    Template {
        prompt: "Which organelle contains the cell's genetic material?",
        options: ["Nucleus", "Mitochondria", "Chloroplast", "Ribosome"],
        answer: "Nucleus",
        explanation: "The nucleus contains chromosomes made of DNA, which stores genetic information.",
    },
    Template {
        prompt: "What is the basic unit of life?",
        options: ["Cell", "Tissue", "Organ", "Molecule"],
        answer: "Cell",
        explanation: "The cell is the smallest structural and functional unit of all living organisms.",
    },
];

const CHEMISTRY: &[Template] = &[
    Template {
        prompt: "What is the chemical symbol for gold?",
        options: ["Au", "Ag", "Cu", "Fe"],
        answer: "Au",
        explanation: "Au comes from the Latin word 'aurum' meaning gold.",
    },
    Template {
        prompt: "How many electrons can the first shell hold?",
        options: ["2", "8", "18", "32"],
        answer: "2",
        explanation: "The first electron shell (K shell) can hold a maximum of 2 electrons.",
    },
    Template {
        prompt: "What type of bond forms between a metal and a non-metal?",
        options: ["Ionic bond", "Covalent bond", "Metallic bond", "Hydrogen bond"],
        answer: "Ionic bond",
        explanation: "Metals lose electrons and non-metals gain electrons, forming ionic bonds.",
    },
    Template {
        prompt: "What is the pH of pure water at 25°C?",
        options: ["7", "0", "14", "1"],
        answer: "7",
        explanation: "Pure water is neutral with a pH of 7 at standard temperature.",
    },
    Template {
        prompt: "Which gas makes up about 78% of Earth's atmosphere?",
        options: ["Nitrogen", "Oxygen", "Carbon dioxide", "Argon"],
        answer: "Nitrogen",
        explanation: "Nitrogen (N₂) comprises approximately 78% of the atmosphere.",
    },
];

const PHYSICS: &[Template] = &[
    Template {
        prompt: "What is the unit of force in the SI system?",
        options: ["Newton", "Joule", "Watt", "Pascal"],
        answer: "Newton",
        explanation: "The Newton (N) is the SI unit of force, defined as kg⋅m/s².",
    },
    Template {
        prompt: "What is the speed of light in vacuum?",
        options: [
            "3.00 × 10⁸ m/s",
            "3.00 × 10⁶ m/s",
            "3.00 × 10¹⁰ m/s",
            "3.00 × 10⁴ m/s",
        ],
        answer: "3.00 × 10⁸ m/s",
        explanation: "The speed of light in vacuum is approximately 299,792,458 m/s or 3.00 × 10⁸ m/s.",
    },
    Template {
        prompt: "According to Newton's first law, an object at rest will:",
        options: [
            "Stay at rest unless acted upon by a force",
            "Always accelerate",
            "Move at constant velocity",
            "Eventually stop",
        ],
        answer: "Stay at rest unless acted upon by a force",
        explanation: "Newton's first law states that objects remain in their state of motion unless acted upon by an unbalanced force.",
    },
    Template {
        prompt: "What type of energy does a moving object possess?",
        options: ["Kinetic energy", "Potential energy", "Thermal energy", "Chemical energy"],
        answer: "Kinetic energy",
        explanation: "Kinetic energy is the energy of motion, calculated as KE = ½mv².",
    },
    Template {
        prompt: "What happens to the wavelength of light as its frequency increases?",
        options: ["Decreases", "Increases", "Stays the same", "Becomes zero"],
        answer: "Decreases",
        explanation: "Wavelength and frequency are inversely related: λ = c/f, where c is the speed of light.",
    },
];

const GENERAL: &[Template] = &[
    Template {
        prompt: "What is a fundamental principle in {topic}?",
        options: [
            "Understanding core concepts",
            "Memorizing definitions",
            "Ignoring applications",
            "Avoiding practice",
        ],
        answer: "Understanding core concepts",
        explanation: "Understanding fundamental principles is key to mastering {topic}.",
    },
    Template {
        prompt: "Which approach is most effective for learning {topic}?",
        options: [
            "Active practice and application",
            "Passive reading only",
            "Avoiding difficult problems",
            "Skipping foundational concepts",
        ],
        answer: "Active practice and application",
        explanation: "Active engagement with the material leads to better understanding and retention.",
    },
    Template {
        prompt: "What is the best way to apply {topic} knowledge?",
        options: [
            "Solve real-world problems",
            "Memorize formulas only",
            "Avoid challenging questions",
            "Study in isolation",
        ],
        answer: "Solve real-world problems",
        explanation: "Applying knowledge to real-world scenarios helps reinforce learning and understanding.",
    },
];

/// 分桶对应的模板列表
pub fn templates(bucket: SubjectBucket) -> &'static [Template] {
    match bucket {
        SubjectBucket::Mathematics => MATHEMATICS,
        SubjectBucket::Biology => BIOLOGY,
        SubjectBucket::Chemistry => CHEMISTRY,
        SubjectBucket::Physics => PHYSICS,
        SubjectBucket::General => GENERAL,
    }
}

/// 生成第 `question_number` 题的兜底题目
///
/// 选择规则为 `templates[question_number % len]`，题数超过模板数时会重复。
/// 结果只取决于 `(subject, topic, question_number, question_type)`。
pub fn fallback_question(
    subject: &str,
    topic: &str,
    question_number: usize,
    question_type: QuestionType,
) -> Question {
    let bucket = SubjectBucket::find(subject);
    let pool = templates(bucket);
    let template = &pool[question_number % pool.len()];
    let render = |text: &str| text.replace("{topic}", topic);

    let options = match question_type {
        QuestionType::Mcq => Some(template.options.iter().map(|o| render(o)).collect()),
        QuestionType::Text => None,
    };

    Question {
        id: format!("q_{}", question_number),
        question_type,
        prompt: render(template.prompt),
        options,
        correct_answer: render(template.answer),
        explanation: render(template.explanation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_template_is_well_formed() {
        for bucket in [
            SubjectBucket::Mathematics,
            SubjectBucket::Biology,
            SubjectBucket::Chemistry,
            SubjectBucket::Physics,
            SubjectBucket::General,
        ] {
            let subject = bucket.keywords().first().copied().unwrap_or("History");
            for n in 0..templates(bucket).len() {
                for ty in [QuestionType::Mcq, QuestionType::Text] {
                    let q = fallback_question(subject, "Rome", n, ty);
                    assert!(q.is_well_formed(), "{} #{} {:?}: {:?}", bucket, n, ty, q.defect());
                }
            }
        }
    }

    #[test]
    fn test_selection_wraps_modulo_pool_size() {
        let first = fallback_question("Biology", "Cells", 1, QuestionType::Mcq);
        let wrapped = fallback_question("Biology", "Cells", 6, QuestionType::Mcq);
        assert_eq!(first.prompt, wrapped.prompt);
        assert_eq!(first.prompt, "Which process converts light energy into chemical energy?");
        assert_ne!(first.id, wrapped.id);
    }

    #[test]
    fn test_general_bucket_is_templated_from_topic() {
        let q = fallback_question("World History", "the Roman Empire", 0, QuestionType::Mcq);
        assert_eq!(q.prompt, "What is a fundamental principle in the Roman Empire?");
        assert!(q.explanation.contains("the Roman Empire"));
    }

    #[test]
    fn test_text_fallback_has_no_options() {
        let q = fallback_question("Chemistry", "Bonds", 2, QuestionType::Text);
        assert!(q.options.is_none());
        assert_eq!(q.correct_answer, "Ionic bond");
    }

    #[test]
    fn test_deterministic_for_same_inputs() {
        let a = fallback_question("Algebra", "Linear equations", 3, QuestionType::Mcq);
        let b = fallback_question("Algebra", "Linear equations", 3, QuestionType::Mcq);
        assert_eq!(a, b);
    }
}
