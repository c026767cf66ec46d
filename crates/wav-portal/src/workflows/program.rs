//! Public description of the four-week bootcamp shown on the landing page.

use serde::Serialize;

use crate::navigation::Page;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoadmapWeek {
    pub week: u8,
    pub phase: &'static str,
    pub title: &'static str,
    pub skills: [&'static str; 4],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Technology {
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricingPlan {
    pub name: &'static str,
    pub price_leones: u32,
    pub billing: &'static str,
    pub summary: &'static str,
    pub recommended: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallToAction {
    pub label: &'static str,
    pub redirect: Page,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgramCatalogue {
    pub name: &'static str,
    pub duration_weeks: u8,
    pub roadmap: Vec<RoadmapWeek>,
    pub technologies: Vec<Technology>,
    pub pricing: Vec<PricingPlan>,
    pub call_to_action: CallToAction,
}

const fn tech(
    name: &'static str,
    category: &'static str,
    description: &'static str,
) -> Technology {
    Technology {
        name,
        category,
        description,
    }
}

impl ProgramCatalogue {
    pub fn standard() -> Self {
        let roadmap = vec![
            RoadmapWeek {
                week: 1,
                phase: "Foundation",
                title: "Web Fundamentals & Design",
                skills: [
                    "Web History & Evolution",
                    "Design Principles",
                    "UI/UX Basics",
                    "Project Planning",
                ],
            },
            RoadmapWeek {
                week: 2,
                phase: "Development",
                title: "Core Technologies",
                skills: [
                    "HTML/CSS Mastery",
                    "JavaScript Fundamentals",
                    "DOM Manipulation",
                    "Server Basics",
                ],
            },
            RoadmapWeek {
                week: 3,
                phase: "Framework",
                title: "Modern Development",
                skills: [
                    "React Development",
                    "State Management",
                    "API Integration",
                    "Backend APIs",
                ],
            },
            RoadmapWeek {
                week: 4,
                phase: "Production",
                title: "Full-Stack & Deployment",
                skills: [
                    "Frontend-Backend Integration",
                    "Database Management",
                    "Deployment",
                    "Maintenance",
                ],
            },
        ];

        let technologies = vec![
            tech("Figma", "Design", "UI/UX Design & Prototyping"),
            tech("Git", "Version Control", "Code versioning & collaboration"),
            tech("HTML5", "Frontend", "Modern markup language"),
            tech("CSS3", "Frontend", "Styling & animations"),
            tech("Tailwind CSS", "Frontend", "Utility-first CSS framework"),
            tech("JavaScript", "Frontend", "ES6+ & DOM manipulation"),
            tech("React", "Frontend", "Component-based UI library"),
            tech("PHP", "Backend", "Server-side programming"),
            tech("SQL", "Database", "Database queries & management"),
            tech("Postman", "API", "API testing & development"),
            tech("Express.js", "Backend", "Node.js web framework"),
            tech("Bundlers", "Build Tools", "Webpack, Vite & more"),
        ];

        let pricing = vec![
            PricingPlan {
                name: "Weekly Payment",
                price_leones: 120,
                billing: "per week",
                summary: "Pay as you learn, week by week",
                recommended: false,
            },
            PricingPlan {
                name: "Full Payment",
                price_leones: 450,
                billing: "full access",
                summary: "Save 6% with upfront payment",
                recommended: true,
            },
        ];

        Self {
            name: "Code with WAV Web Development Bootcamp",
            duration_weeks: 4,
            roadmap,
            technologies,
            pricing,
            call_to_action: CallToAction {
                label: "Apply Now - Limited Spots",
                redirect: Page::Register,
            },
        }
    }

    pub fn technologies_in<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a Technology> + 'a {
        self.technologies
            .iter()
            .filter(move |technology| technology.category == category)
    }

    pub fn recommended_plan(&self) -> Option<&PricingPlan> {
        self.pricing.iter().find(|plan| plan.recommended)
    }
}
