use coroa_types::models::Profile;

/// One line of a scripted reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Text(&'static str),
    /// Voice note. `transcript` is what the client shows under the player.
    Audio {
        transcript: &'static str,
        duration: &'static str,
    },
}

/// One scripted reply: a single text, or an audio note followed by a text.
pub type Stage = &'static [Line];

pub struct SeedProfile {
    pub id: &'static str,
    pub name: &'static str,
    pub age: u8,
    pub city: &'static str,
    pub bio: &'static str,
    pub interests: &'static [&'static str],
    pub photo: &'static str,
    pub script: &'static [Stage],
}

impl SeedProfile {
    pub fn to_profile(&self) -> Profile {
        Profile {
            id: self.id.to_string(),
            name: self.name.to_string(),
            age: self.age,
            city: self.city.to_string(),
            bio: self.bio.to_string(),
            interests: self.interests.iter().map(|s| s.to_string()).collect(),
            photo: self.photo.to_string(),
        }
    }
}

pub fn profiles() -> &'static [SeedProfile] {
    PROFILES
}

pub fn find(id: &str) -> Option<&'static SeedProfile> {
    PROFILES.iter().find(|p| p.id == id)
}

pub fn is_seed_profile(id: &str) -> bool {
    find(id).is_some()
}

static PROFILES: &[SeedProfile] = &[
    SeedProfile {
        id: "marcia",
        name: "Márcia",
        age: 48,
        city: "Belo Horizonte",
        bio: "Professora aposentada, adoro um pão de queijo e uma boa conversa.",
        interests: &["culinária", "viagens", "MPB"],
        photo: "/profiles/marcia.jpg",
        script: &[
            &[Line::Text("Oi! Que bom que deu match 😊")],
            &[Line::Text("Me conta, o que você gosta de fazer no fim de semana?")],
            &[
                Line::Audio { transcript: "Ai, desculpa o áudio, tô na cozinha!", duration: "0:12" },
                Line::Text("Tô fazendo um bolo de fubá, você gosta?"),
            ],
            &[Line::Text("Adorei conversar com você. Vamos marcar um café?")],
        ],
    },
    SeedProfile {
        id: "solange",
        name: "Solange",
        age: 52,
        city: "Salvador",
        bio: "Empresária, mãe de dois, apaixonada por praia e forró.",
        interests: &["praia", "forró", "empreendedorismo"],
        photo: "/profiles/solange.jpg",
        script: &[
            &[Line::Text("Olá! Vi que você curtiu meu perfil 😄")],
            &[
                Line::Audio { transcript: "Oi, tudo bem? Prefiro mandar áudio, é mais rápido.", duration: "0:09" },
                Line::Text("Você já veio pra Salvador?"),
            ],
            &[Line::Text("Aqui o pôr do sol no Farol da Barra é imperdível.")],
        ],
    },
    SeedProfile {
        id: "vera",
        name: "Vera",
        age: 45,
        city: "Curitiba",
        bio: "Arquiteta, leitora compulsiva e fã de cinema europeu.",
        interests: &["livros", "cinema", "arquitetura"],
        photo: "/profiles/vera.jpg",
        script: &[
            &[Line::Text("Oi, tudo bem?")],
            &[Line::Text("Qual foi o último livro que você leu?")],
            &[Line::Text("Hmm, interessante! Eu tô relendo Clarice Lispector.")],
            &[
                Line::Audio { transcript: "Olha, tem uma mostra de cinema francês semana que vem...", duration: "0:21" },
                Line::Text("Topa ir comigo?"),
            ],
            &[Line::Text("Combinado então 😉")],
        ],
    },
    SeedProfile {
        id: "celia",
        name: "Célia",
        age: 55,
        city: "Porto Alegre",
        bio: "Médica, gaúcha de coração, não dispenso um chimarrão.",
        interests: &["chimarrão", "caminhadas", "jardinagem"],
        photo: "/profiles/celia.jpg",
        script: &[
            &[Line::Text("Bah, que legal esse match!")],
            &[Line::Text("Você gosta de caminhar? Eu faço trilha todo domingo.")],
            &[
                Line::Audio { transcript: "Tô saindo do plantão agora, mas queria te responder.", duration: "0:14" },
                Line::Text("Depois me manda uma foto do teu dia?"),
            ],
        ],
    },
    SeedProfile {
        id: "regina",
        name: "Regina",
        age: 50,
        city: "São Paulo",
        bio: "Advogada, viciada em café e em shows de jazz.",
        interests: &["jazz", "café", "gastronomia"],
        photo: "/profiles/regina.jpg",
        script: &[
            &[Line::Text("Oi! Adorei suas fotos.")],
            &[Line::Text("Você curte jazz? Tem um bar ótimo na Vila Madalena.")],
            &[Line::Text("Então tá, sexta às 20h?")],
            &[Line::Text("Te espero lá ☕🎷")],
        ],
    },
];
